//! yubikey-validate - check a YubiKey OTP against the validation service.

use std::env;
use std::process::ExitCode;

use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yubikey_validate::config::Settings;
use yubikey_validate::error::ValidateError;
use yubikey_validate::validator::{Validator, Verdict};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

/// Parsed command line.
struct Args {
    config_path: String,
    otp: Option<String>,
    multi: bool,
    json: bool,
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().collect();

    if raw.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if raw.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {} (see --help)", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(otp) = args.otp.clone() else {
        eprintln!("Error: missing OTP argument (see --help)");
        return ExitCode::FAILURE;
    };

    let settings = match Settings::load(&args.config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }
    debug!(config = %args.config_path, "Configuration loaded");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error creating Tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let multi = args.multi || settings.client.multi;
    match runtime.block_on(run(&settings, &otp, multi)) {
        Ok(verdict) => {
            if let Err(e) = report(&verdict, args.json) {
                error!(error = %e, "Failed to print verdict");
                return ExitCode::FAILURE;
            }
            if verdict.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "Check failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the validator and run one check.
async fn run(settings: &Settings, otp: &str, multi: bool) -> Result<Verdict, ValidateError> {
    let validator = Validator::from_settings(settings)?;
    validator.check_with(otp, multi).await
}

/// Print the verdict to stdout.
fn report(verdict: &Verdict, json: bool) -> Result<(), ValidateError> {
    if json {
        println!("{}", serde_json::to_string_pretty(verdict)?);
        return Ok(());
    }

    println!("{}", if verdict.success { "OK" } else { "REJECTED" });
    println!("yubikey id: {}", verdict.yubikey_id);
    for response in &verdict.responses {
        println!(
            "  {} status={} latency={:.3}s",
            response.host().unwrap_or("-"),
            response.status().map(|s| s.as_str()).unwrap_or("-"),
            response.latency_seconds()
        );
    }
    if verdict.failures > 0 || verdict.rejected > 0 {
        println!(
            "  ({} unreachable, {} with bad signatures)",
            verdict.failures, verdict.rejected
        );
    }
    Ok(())
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Check a YubiKey one-time password against the validation service.

USAGE:
    {} [OPTIONS] <OTP>

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: /etc/yubikey-validate/config.toml]
    -m, --multi            Query every configured host
        --json             Print the verdict as JSON
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME
    );
}

/// Parse command line arguments (simple std::env approach).
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config_path: "/etc/yubikey-validate/config.toml".to_string(),
        otp: None,
        multi: false,
        json: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => match iter.next() {
                Some(path) if !path.starts_with('-') => parsed.config_path = path.clone(),
                _ => return Err(format!("{} requires a path", arg)),
            },
            "--multi" | "-m" => parsed.multi = true,
            "--json" => parsed.json = true,
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    if path.is_empty() {
                        return Err("--config requires a path".to_string());
                    }
                    parsed.config_path = path.to_string();
                } else if parsed.otp.is_none() {
                    parsed.otp = Some(other.to_string());
                }
            }
        }
    }

    Ok(parsed)
}

/// Initialize logging based on settings.
///
/// Logs go to stderr so stdout carries only the verdict.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
