//! auth-config
//!
//! Resolves an auth service configuration from a TOML document plus secrets
//! taken from the environment, and reports what it found.
//!
//! ```text
//!   config.toml ──▶ decode ──▶ overlay (AUTH_* env) ──▶ validate ──▶ report
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use auth_config::config::loader::{decode_auth, read_document};
use auth_config::config::secrets::{env_name, secret_paths};
use auth_config::config::{overlay_and_validate, ConfigError, ResolvedConfig, SecretSource};
use auth_config::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "auth-config")]
#[command(about = "Resolve and check auth service configuration", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset.
    #[arg(long, env = "AUTH_CONFIG_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Prefix of the environment variables that carry secrets.
    #[arg(long, env = "AUTH_CONFIG_ENV_PREFIX", default_value = "AUTH", global = true)]
    env_prefix: String,

    /// Dotted name of the auth table inside the document (e.g. "auth").
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and report every problem
    Check { file: PathBuf },
    /// Print the resolved configuration as JSON
    Show {
        file: PathBuf,
        /// Include secret values in the output
        #[arg(long)]
        with_secrets: bool,
    },
    /// List the environment variables read as secrets
    Secrets { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ConfigError> {
    match &cli.command {
        Commands::Check { file } => {
            let config = resolve_file(cli, file)?;
            println!(
                "ok: {} provider(s) enabled, sms vendor: {}",
                config.enabled_providers().len(),
                config.sms.enabled_vendors().first().copied().unwrap_or("none"),
            );
        }
        Commands::Show { file, with_secrets } => {
            let config = resolve_file(cli, file)?;
            let json = if *with_secrets {
                config.export_with_secrets()
            } else {
                config.to_redacted_json()
            };
            let text = json.and_then(|value| serde_json::to_string_pretty(&value))?;
            println!("{text}");
        }
        Commands::Secrets { file } => {
            let document = read_document(file, cli.table.as_deref())?;
            let config = decode_auth(&document).map_err(ConfigError::Decode)?;
            for path in secret_paths(&config) {
                let name = env_name(&cli.env_prefix, &path);
                let state = if std::env::var_os(&name).is_some() { "set" } else { "unset" };
                println!("{name}\t{path}\t{state}");
            }
        }
    }
    Ok(())
}

fn resolve_file(cli: &Cli, file: &Path) -> Result<ResolvedConfig, ConfigError> {
    let document = read_document(file, cli.table.as_deref())?;
    let decoded = decode_auth(&document).map_err(ConfigError::Decode)?;
    let secrets = SecretSource::from_env(&cli.env_prefix, &decoded);
    tracing::debug!(secrets = secrets.len(), "Secrets read from environment");
    overlay_and_validate(decoded, &secrets)
}

fn report(err: &ConfigError) {
    match err {
        ConfigError::Decode(errors) => {
            eprintln!("config has {} decode error(s):", errors.len());
            for e in errors {
                eprintln!("  {e}");
            }
        }
        ConfigError::Validation(violations) => {
            eprintln!("config has {} violation(s):", violations.len());
            for v in violations {
                eprintln!("  {v}");
            }
        }
        other => eprintln!("Error: {other}"),
    }
}
