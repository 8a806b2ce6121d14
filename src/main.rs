use anyhow::Result;
use clap::Parser;
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use timesort::timesort_core::{Cli, Organizer, TimesortError, get_local_offset};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("timesort.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    // Must happen while the process is still single-threaded
    let local_offset = get_local_offset();

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let config = cli.to_config(local_offset);
    let dry_run = config.dry_run;
    let organizer = Organizer::new(config)?.with_cancel_flag(cancelled);
    let stats = organizer.run()?;

    if dry_run {
        println!("\nDry run: {} files would be placed", stats.planned);
        if stats.duplicates_skipped > 0 {
            println!("  {} duplicates skipped", stats.duplicates_skipped);
        }
    } else {
        println!("\nOrganize complete!");
        println!("  {} images placed", stats.images_placed);
        println!("  {} videos placed", stats.videos_placed);
        if stats.duplicates_skipped > 0 {
            println!("  {} duplicates skipped", stats.duplicates_skipped);
        }
        if stats.already_present > 0 {
            println!("  {} already present", stats.already_present);
        }
    }
    if stats.failed > 0 {
        println!("  {} failed (see log)", stats.failed);
    }

    if stats.cancelled {
        return Err(TimesortError::Cancelled.into());
    }
    Ok(())
}
