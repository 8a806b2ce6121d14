use crate::timesort_core::ledger::DEFAULT_LEDGER_FILENAME;
use crate::timesort_core::organizer::{DEFAULT_LANGUAGE, OrganizerConfig, Placement};
use clap::Parser;
use simplelog::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use time::UtcOffset;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sort photos and videos into folders by capture time and place")]
pub struct Cli {
    /// Directory containing media to organize (searched recursively)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Root of the organized output tree
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Use this place name for every file instead of looking it up from GPS data
    #[arg(short = 'L', long)]
    pub location: Option<String>,

    /// Ledger of already processed content
    #[arg(long, default_value = DEFAULT_LEDGER_FILENAME)]
    pub ledger: PathBuf,

    /// Language requested for reverse-geocoded place names
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Timeout in seconds for each reverse-geocoding request
    #[arg(long, default_value_t = 10)]
    pub geocode_timeout: u64,

    /// Move files instead of copying (deletes originals once placed)
    #[arg(long)]
    pub r#move: bool,

    /// Show where files would go without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Enable file logging to timesort.log
    #[arg(long = "log")]
    pub log: bool,

    /// Log level for file logging (debug, info, warn, error)
    #[arg(long, default_value_t = LevelFilter::Debug)]
    pub log_level: LevelFilter,
}

impl Cli {
    /// Run configuration for these arguments. `local_offset` must be obtained
    /// before any thread is spawned.
    pub fn to_config(&self, local_offset: UtcOffset) -> OrganizerConfig {
        OrganizerConfig {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            fixed_location: self.location.clone(),
            ledger_path: self.ledger.clone(),
            language: self.language.clone(),
            geocode_timeout: Duration::from_secs(self.geocode_timeout),
            placement: if self.r#move {
                Placement::Move
            } else {
                Placement::Copy
            },
            dry_run: self.dry_run,
            local_offset,
        }
    }
}
