use clap::{ArgAction, Parser};

/// Runtime configuration, read from flags or the environment (flags win).
///
/// Boolean settings take an explicit value (`true`/`false`, `1`/`0`, and
/// similar) so they can be driven from pipeline variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drift-server",
    version,
    about = "Drift Guardian report ingestion server"
)]
pub struct ServerConfig {
    /// Redis connection string, e.g. redis://localhost:6379/0
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log filter (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Require a bearer token on the report endpoint
    #[arg(
        long,
        env = "ENABLE_AUTHENTICATION",
        action = ArgAction::Set,
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub enable_authentication: bool,

    /// Expected bearer token; required when authentication is enabled
    #[arg(long, env = "BEARER_TOKEN", default_value = "")]
    pub bearer_token: String,

    /// GitLab API base URL
    #[arg(long, env = "GITLAB_API_URL", default_value = "https://gitlab.com/api/v4")]
    pub gitlab_api_url: String,

    /// GitLab API token; issue escalation fails without one
    #[arg(long, env = "GITLAB_API_TOKEN", default_value = "")]
    pub gitlab_api_token: String,

    /// Accept invalid TLS certificates from the GitLab host
    #[arg(
        long,
        env = "GITLAB_SKIP_TLS_VERIFY",
        action = ArgAction::Set,
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub gitlab_skip_tls_verify: bool,

    /// Branch whose pipeline runs are authoritative for drift tracking
    #[arg(long, env = "COMPARISON_BRANCH", default_value = "main")]
    pub comparison_branch: String,

    /// Threshold applied when a record carries no override of its own
    #[arg(long, env = "DEFAULT_DRIFT_THRESHOLD", default_value_t = 1)]
    pub default_drift_threshold: i64,
}

impl ServerConfig {
    /// Cross-field checks that clap cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enable_authentication && self.bearer_token.is_empty() {
            anyhow::bail!("BEARER_TOKEN must be set when authentication is enabled");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut full = vec!["drift-server", "--redis-url", "redis://localhost:6379/0"];
        full.extend_from_slice(args);
        ServerConfig::try_parse_from(full).unwrap()
    }

    #[test]
    fn drift_defaults_are_applied() {
        let cfg = parse(&[]);
        assert_eq!(cfg.comparison_branch, "main");
        assert_eq!(cfg.default_drift_threshold, 1);
        assert_eq!(cfg.gitlab_api_url, "https://gitlab.com/api/v4");
        assert!(!cfg.enable_authentication);
    }

    #[test]
    fn boolean_flags_take_explicit_values() {
        let cfg = parse(&["--enable-authentication", "true", "--bearer-token", "tok"]);
        assert!(cfg.enable_authentication);

        let cfg = parse(&["--gitlab-skip-tls-verify", "true"]);
        assert!(cfg.gitlab_skip_tls_verify);

        let cfg = parse(&["--enable-authentication", "1", "--bearer-token", "tok"]);
        assert!(cfg.enable_authentication);

        let cfg = parse(&["--enable-authentication", "false"]);
        assert!(!cfg.enable_authentication);
    }

    #[test]
    fn validate_requires_token_when_auth_enabled() {
        let cfg = parse(&["--enable-authentication", "true"]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_auth_with_token() {
        let cfg = parse(&["--enable-authentication", "true", "--bearer-token", "tok"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_accepts_disabled_auth_without_token() {
        let cfg = parse(&[]);
        assert!(cfg.validate().is_ok());
    }
}
