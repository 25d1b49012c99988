use clap::{ArgAction, Parser};
use drift_core::report::{OP_APPLY, OP_DESTROY, OP_PLAN};

use crate::runner::RunOutcome;

mod debug;
mod payload;
mod runner;
mod webhook;

const DETAILED_EXITCODE_FLAG: &str = "-detailed-exitcode";

/// Terraform wrapper that reports pipeline outcomes to a Drift Guardian
/// server. Everything after the wrapper flags is handed to terraform
/// verbatim, so `drift-ci plan -var-file=prod.tfvars` behaves like the bare
/// command with drift reporting bolted on.
#[derive(Debug, Parser)]
#[command(
    name = "drift-ci",
    version,
    about = "Terraform wrapper that reports drift to a Drift Guardian server"
)]
struct Cli {
    /// Base URL of the Drift Guardian service. Reporting is skipped when
    /// empty.
    #[arg(long, env = "DRIFT_GUARDIAN_ENDPOINT", default_value = "")]
    drift_endpoint: String,

    /// Whether this run was started by a pipeline schedule. Only scheduled
    /// comparison-branch plans count toward drift.
    #[arg(
        long,
        env = "SCHEDULED",
        action = ArgAction::Set,
        default_value_t = false,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    drift_scheduled: bool,

    /// Terraform version handed to tfenv via TFENV_TERRAFORM_VERSION.
    #[arg(long, env = "TERRAFORM_VERSION", default_value = "")]
    terraform_version: String,

    /// Terraform command and arguments, passed through untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    if cli.command.is_empty() {
        eprintln!("Usage: drift-ci [flags] <terraform command> [terraform args]");
        std::process::exit(1);
    }

    let operation = cli.command[0].clone();
    let mut tf_args = cli.command.clone();

    // Plan runs need -detailed-exitcode so exit code 2 can signal detected
    // changes. Respect the flag if the caller already passed it.
    if operation == OP_PLAN && !tf_args[1..].iter().any(|arg| arg == DETAILED_EXITCODE_FLAG) {
        tf_args.push(DETAILED_EXITCODE_FLAG.to_string());
        debug::log("Added -detailed-exitcode flag to terraform plan command");
    }

    let binary = runner::resolve_binary();

    debug::log("Drift Guardian CLI configured with:");
    debug::log(format!("  Endpoint: {}", cli.drift_endpoint));
    debug::log(format!("  Scheduled: {}", cli.drift_scheduled));
    debug::log(format!("  Terraform version: {}", cli.terraform_version));
    debug::log(format!("  Terraform binary: {binary}"));
    debug::log(format!("  Operation: {operation}"));
    debug::log(format!("  Terraform args: {tf_args:?}"));

    // A spawn failure is reported to the guardian as exit code 1 before the
    // wrapper itself gives up.
    let capture = operation == OP_PLAN;
    let (run, spawn_error) =
        match runner::run_terraform(&binary, &tf_args, &cli.terraform_version, capture) {
            Ok(run) => (run, None),
            Err(err) => (
                RunOutcome {
                    exit_code: 1,
                    plan_output: String::new(),
                },
                Some(err),
            ),
        };

    debug::log(format!(
        "Terraform command exited with code: {}",
        run.exit_code
    ));

    if !cli.drift_endpoint.is_empty()
        && matches!(operation.as_str(), OP_PLAN | OP_APPLY | OP_DESTROY)
    {
        let report = payload::collect(
            &operation,
            run.exit_code,
            cli.drift_scheduled,
            &run.plan_output,
        );
        webhook::send_report(&cli.drift_endpoint, &report);
    }

    // Terraform's own failures have already been shown on the inherited
    // streams; the wrapper only fails when the command could not run.
    if let Some(err) = spawn_error {
        eprintln!("Error executing terraform: {err:#}");
        std::process::exit(1);
    }
}
