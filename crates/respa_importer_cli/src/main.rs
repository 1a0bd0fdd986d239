//! `respa-import` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, load settings and start logging.
//! - List registered importers or run one of them.

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use respa_importer_core::db::open_db;
use respa_importer_core::{
    init_logging, init_stderr_logging, ImportOptions, ImportService, Settings,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import units into the Respa database", long_about = None)]
struct Cli {
    /// Settings file (TOML); `RESPA_*` variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file, overriding settings
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered importers
    List,
    /// Run one importer
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Importer name, see `list`
    importer: String,
    /// Data file name or absolute path, instead of the importer's default
    #[arg(long)]
    file: Option<String>,
    /// Roll back instead of committing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => report_failure(&message),
    }
}

fn report_failure(message: &str) -> ExitCode {
    error!("event=cli_run module=cli status=error error={message}");
    eprintln!("error: {message}");
    ExitCode::FAILURE
}

fn run(cli: Cli) -> Result<(), String> {
    let mut settings = Settings::load(cli.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    start_logging(&settings)?;

    let mut conn = open_db(&settings.database_path).map_err(|err| err.to_string())?;
    let mut service = ImportService::new(&mut conn, &settings);

    match cli.command {
        Command::List => {
            for entry in service.list_importers() {
                println!("{:<16} {}", entry.name, entry.description);
            }
            Ok(())
        }
        Command::Run(args) => {
            let options = ImportOptions {
                data_file: args.file,
                dry_run: args.dry_run,
            };
            let summary = service
                .run(&args.importer, options)
                .map_err(|err| err.to_string())?;
            info!(
                "event=cli_run module=cli status=ok importer={} total={}",
                args.importer,
                summary.total()
            );
            println!(
                "{}: {} created, {} updated, {} unchanged{}",
                args.importer,
                summary.created,
                summary.updated,
                summary.unchanged,
                if args.dry_run { " (dry run, rolled back)" } else { "" }
            );
            Ok(())
        }
    }
}

fn start_logging(settings: &Settings) -> Result<(), String> {
    match &settings.log_dir {
        Some(dir) => {
            let dir = dir
                .to_str()
                .ok_or_else(|| format!("log_dir is not valid UTF-8: {}", dir.display()))?;
            init_logging(&settings.log_level, dir)
        }
        None => init_stderr_logging(&settings.log_level),
    }
}

#[cfg(test)]
mod tests {
    use super::{report_failure, run, Cli, Command};
    use clap::Parser;
    use std::process::ExitCode;

    #[test]
    fn parses_run_with_global_options() {
        let cli = Cli::try_parse_from([
            "respa-import",
            "run",
            "units_json",
            "--file",
            "libraries.json",
            "--dry-run",
            "--database",
            "/tmp/respa.sqlite3",
        ])
        .expect("arguments should parse");

        assert_eq!(
            cli.database.as_deref(),
            Some(std::path::Path::new("/tmp/respa.sqlite3"))
        );
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.importer, "units_json");
                assert_eq!(args.file.as_deref(), Some("libraries.json"));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_without_importer_name_is_rejected() {
        assert!(Cli::try_parse_from(["respa-import", "run"]).is_err());
    }

    #[test]
    fn missing_settings_file_fails_the_run() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cli = Cli::try_parse_from([
            "respa-import",
            "--config",
            dir.path().join("missing.toml").to_str().expect("utf-8 path"),
            "list",
        ])
        .expect("arguments should parse");

        let message = run(cli).expect_err("missing settings file should fail");
        assert!(message.contains("missing.toml"));
        assert_eq!(
            format!("{:?}", report_failure(&message)),
            format!("{:?}", ExitCode::FAILURE)
        );
    }
}
