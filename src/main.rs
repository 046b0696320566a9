use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use mssql_backup_lib::cli::Cli;
use mssql_backup_lib::config::{Config, DEFAULT_CONFIG_PATH};
use mssql_backup_lib::report;
use mssql_backup_lib::rotation::{
    DryRun, FsRemover, Remover, RetentionPolicy, Rotations, Rotator,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // init logger
    let mut env_logger = env_logger::builder();
    if let Some(level) = cli.verbose {
        env_logger.filter_level(level);
    }
    env_logger.try_init().expect("env_logger should not fail");

    if cli.print_default_config {
        return match toml::to_string_pretty(&Config::default()) {
            Ok(config_str) => {
                print!("{config_str}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Serializing the default config failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match &cli.config {
        Some(path) => Config::load(path, true),
        None => Config::load(Path::new(DEFAULT_CONFIG_PATH), false),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!(target: "config", "{e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let directory = cli.directory(&config);
    let policy = match RetentionPolicy::from_config(directory, &cli.retention(&config)) {
        Ok(policy) => policy,
        Err(e) => {
            log::error!(target: "rotation", "{e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if cli.dry_run {
        log::warn!("Running in dry-run mode");
        run(&cli, &config, &policy, Rotator::new(DryRun))
    } else {
        run(&cli, &config, &policy, Rotator::new(FsRemover))
    }
}

fn run<R: Remover>(
    cli: &Cli,
    config: &Config,
    policy: &RetentionPolicy,
    rotator: Rotator<R>,
) -> ExitCode {
    let rotations = if cli.per_database(config) {
        rotator.rotate_per_database(policy)
    } else {
        rotator.rotate(policy).map(Rotations::from)
    };
    let rotations = match rotations {
        Ok(rotations) => rotations,
        Err(e) => {
            log::error!(target: "rotation", "{e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let output = report::render(&rotations, cli.json);
    match &output {
        Ok(output) => println!("{output}"),
        Err(e) => log::error!("Rendering the rotation report failed: {e}"),
    }

    ExitCode::from(exit_status(&rotations, &output))
}

/// Exit status once the rotation ran. Any failure, including an unrenderable
/// report, maps to [EXIT_FAILED].
fn exit_status(rotations: &Rotations, output: &serde_json::Result<String>) -> u8 {
    if rotations.is_success() && output.is_ok() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILED
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mssql_backup_lib::rotation::{RotationError, RotationResult};

    use super::*;

    #[test]
    fn successful_run_exits_zero() {
        let rotations = Rotations::from(RotationResult::default());
        assert_eq!(exit_status(&rotations, &Ok(String::new())), EXIT_SUCCESS);
    }

    #[test]
    fn unprintable_report_fails() {
        let rotations = Rotations::from(RotationResult::default());
        let output = serde_json::from_str::<String>("not json");
        assert_eq!(exit_status(&rotations, &output), EXIT_FAILED);
    }

    #[test]
    fn failed_database_folder_fails() {
        let rotations = Rotations {
            results: vec![RotationResult::default()],
            errors: vec![RotationError::NotADirectory(PathBuf::from("/backups/pubs"))],
        };
        assert_eq!(exit_status(&rotations, &Ok(String::new())), EXIT_FAILED);
    }
}
