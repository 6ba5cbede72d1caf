//! Config validation CLI tool
//!
//! Validates a focuslockd configuration file and reports any errors.

use focuslock_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a focuslockd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match focuslock_config::load_config(&config_path) {
        Ok(settings) => {
            println!("Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", focuslock_config::CURRENT_CONFIG_VERSION);
            println!("  Self app id: {}", settings.service.self_app_id);
            println!("  Require PIN (initial): {}", settings.parent.require_pin);
            println!("  Locked apps: {}", settings.locked_apps.len());
            for app in &settings.locked_apps {
                println!("  - {}", app);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Configuration validation failed");
            eprintln!();
            match &e {
                focuslock_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                focuslock_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                focuslock_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                focuslock_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        focuslock_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
