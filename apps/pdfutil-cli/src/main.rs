//! pdfutil binary
//!
//! Parses arguments, sets up logging and dispatches to `pdfutil-core`.
//! Every failure is reported as one `error:` line with exit code 1.

mod args;

use args::{expand_erase_flags, first_input, Cli, Command};
use clap::error::ErrorKind;
use clap::Parser;
use pdfutil_core::{dump_infos, edit_file, merge_files, Edit, Outcome};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(expand_erase_flags(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
                _ => 1,
            };
            // Nothing useful to do if the terminal is gone
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr. `RUST_LOG` overrides the default level, which is WARN, or
/// DEBUG with `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(command: Command) -> pdfutil_core::Result<()> {
    match command {
        Command::Merge { inputs, output } => {
            let target = output.target(first_input(&inputs)?)?;
            report(merge_files(&inputs, &target)?);
        }
        Command::Rotate(args) => {
            let target = args.output.target(&args.input)?;
            let edit = Edit::Rotate(args.spec()?);
            report(edit_file(&args.input, &edit, &target)?);
        }
        Command::Delete(args) => {
            let target = args.output.target(&args.input)?;
            let edit = Edit::Delete(args.spec());
            report(edit_file(&args.input, &edit, &target)?);
        }
        Command::Info(args) => {
            let target = args.output.target(&args.input)?;
            let edit = Edit::Info(args.edits());
            report(edit_file(&args.input, &edit, &target)?);
        }
        Command::DumpInfos { input, json } => {
            let info = dump_infos(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print!("{}", info);
            }
        }
    }
    Ok(())
}

fn report(outcome: Outcome) {
    tracing::debug!(
        path = %outcome.path.display(),
        pages = outcome.page_count,
        conflicts = ?outcome.conflicts,
        "done"
    );
}
