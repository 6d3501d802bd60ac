//! Capstan CLI - capture, validate and persist project configuration.

use capstan::cli::{Cli, Commands};
use capstan::commands;
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let human = cli.human;

    let verbose = matches!(&cli.command, Commands::Capture { debug: true, .. });
    init_tracing(verbose);

    let project = resolve_project(cli.project, human);

    match run_command(cli.command, &project, &cli.definition) {
        Ok(result) => output(&result, human),
        Err(e) => {
            if human {
                eprintln!("Error: {}", e);
            } else {
                let err = serde_json::json!({ "error": e.to_string() });
                eprintln!("{}", err);
            }
            process::exit(1);
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "capstan=debug" } else { "capstan=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the project directory: --project flag or CAPSTAN_PROJECT env var,
/// verified to exist; the current working directory otherwise.
fn resolve_project(explicit: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit {
        Some(path) => {
            if !path.exists() {
                if human {
                    eprintln!(
                        "Error: Specified project path does not exist: {}",
                        path.display()
                    );
                } else {
                    eprintln!(
                        r#"{{"error": "Specified project path does not exist: {}"}}"#,
                        path.display()
                    );
                }
                process::exit(1);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn run_command(
    command: Commands,
    project: &Path,
    definition: &Path,
) -> Result<serde_json::Value, capstan::Error> {
    match command {
        Commands::Capture {
            prompt,
            form,
            file,
            defaults,
            fresh,
            debug,
            strict,
        } => commands::capture(
            project,
            definition,
            commands::CaptureOptions {
                prompt,
                form,
                file,
                defaults,
                fresh,
                debug,
                strict,
            },
        ),
        Commands::Show => commands::show(project, definition),
        Commands::Value { prop } => commands::value(project, definition, &prop),
        Commands::Paths => commands::paths(project, definition),
    }
}

fn output(result: &serde_json::Value, human: bool) {
    if human {
        match serde_yaml::to_string(result) {
            Ok(yaml) => print!("{yaml}"),
            Err(_) => println!("{result}"),
        }
    } else {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{result}"),
        }
    }
}
