/// Diagnostic prints, enabled by `GUARDIAN_DEBUG`. The wrapper runs inside
/// pipeline logs and must stay silent unless asked.
pub fn enabled() -> bool {
    std::env::var("GUARDIAN_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "t" | "true"))
        .unwrap_or(false)
}

pub fn log<S: AsRef<str>>(message: S) {
    if enabled() {
        println!("{}", message.as_ref());
    }
}
