pub mod args;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use emptydirs_core::action::{Action, Executor};
use emptydirs_core::config::{Config, RunConfig};
use emptydirs_core::coordinator::{BatchCoordinator, RunOutcome, RunSummary};
use emptydirs_core::trash::{platform_name, trash_location_name, SystemTrash};
use tracing::info;

use self::args::Cli;
use self::progress::LogProgress;

/// Exit status for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

pub fn run(cli: Cli) -> color_eyre::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let quiet = cli.quiet || config.quiet;
    // Reject a bad batch size before logging starts or the root is touched.
    let run_config = RunConfig::new(cli.batch_size.unwrap_or(config.batch_size), !quiet)?;
    logging::init(quiet, cli.verbose)?;

    let action = Action::from(cli.action);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))?;
    }

    info!("Platform detected: {}", platform_name());
    info!("Searching for empty directories in {}...", cli.path.display());

    let progress = LogProgress::new(Duration::from_secs(config.progress_interval_secs));
    let mut coordinator = BatchCoordinator::new(run_config, progress).with_cancel(cancel);

    // Keep stdout a single JSON document when --json is set.
    let out: Box<dyn Write> = if cli.json {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout().lock())
    };
    let mut executor = Executor::new(action, out, SystemTrash);
    let summary = coordinator.scan(&cli.path, &mut executor)?;
    drop(executor);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(exit_code(&summary))
}

fn print_summary(s: &RunSummary) {
    match s.action {
        Action::List | Action::Count => {
            eprintln!("Found {} empty directories", s.discovered);
        }
        Action::Trash => {
            eprintln!(
                "Operation complete: {}/{} directories successfully moved to {}",
                s.succeeded,
                s.discovered,
                trash_location_name()
            );
        }
    }

    if s.failed > 0 {
        eprintln!("Failed: {}", s.failed);
        for failure in &s.failures {
            eprintln!("  ! {failure}");
        }
    }
    if s.vanished > 0 {
        eprintln!("Already gone: {}", s.vanished);
    }
    if s.skipped > 0 {
        eprintln!("Skipped {} unreadable directories", s.skipped);
    }

    match &s.outcome {
        RunOutcome::Completed => {}
        RunOutcome::Cancelled => {
            eprintln!("Interrupted: stopped after batch {}.", s.batches);
        }
        RunOutcome::Aborted(reason) => {
            eprintln!("Aborted: {reason}");
        }
    }
}

fn exit_code(s: &RunSummary) -> ExitCode {
    match s.outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
        RunOutcome::Aborted(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use emptydirs_core::error::Error;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("emptydirs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn zero_batch_size_fails_before_the_root_is_inspected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config.toml");
        fs::write(&config, "").unwrap();
        let missing = tmp.path().join("missing");

        let cli = parse(&[
            missing.to_str().unwrap(),
            "--batch-size",
            "0",
            "--config",
            config.to_str().unwrap(),
        ]);
        let err = run(cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn batch_size_from_config_is_validated_too() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config.toml");
        fs::write(&config, "batch_size = -3\n").unwrap();

        let cli = parse(&[
            tmp.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ]);
        let err = run(cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidBatchSize(-3))
        ));
    }
}
