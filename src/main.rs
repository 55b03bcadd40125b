//! trsync CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use trsync::cli::commands;
use trsync::cli::{Cli, Commands};
use trsync::error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,reqwest=info,hyper_util=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let config = cli.config.as_deref();
    let kind = cli.artifact_type;

    match &cli.command {
        Commands::Connect => commands::connect::execute(config, kind, json),
        Commands::Validate => commands::connect::execute_validate(config, kind, json),

        // Discovery
        Commands::FindNew => commands::discover::execute_find_new(config, kind, json),
        Commands::FindUpdates { since } => {
            commands::discover::execute_find_updates(since, config, kind, json)
        }

        // Single artifacts
        Commands::Find { id, kind: find_kind } => {
            commands::artifact::execute_find(id, *find_kind, config, kind, json)
        }
        Commands::Delete { id } => commands::artifact::execute_delete(id, config, kind, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(json),
    }
}
