use crate::timesort_core::digest::{ContentDigest, hash_file};
use crate::timesort_core::error::{Result, TimesortError};
use crate::timesort_core::gps::resolve_coordinates;
use crate::timesort_core::ledger::{DEFAULT_LEDGER_FILENAME, DedupLedger};
use crate::timesort_core::location::{Geocoder, LocationLabel, LocationResolver, NominatimGeocoder};
use crate::timesort_core::media::{MediaFile, MediaKind};
use crate::timesort_core::metadata::{Ffprobe, MetadataExtractor, VideoProbe};
use crate::timesort_core::timestamp::{ResolvedTimestamp, TimeResolver, get_local_offset};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{PrimitiveDateTime, UtcOffset};
use walkdir::WalkDir;

/// Year-month folder under the year folder.
pub const MONTH_DIR_FORMAT: &[FormatItem] = format_description!("[year]-[month]");

/// Timestamp prefix of a destination file name.
pub const FILE_NAME_DATE_FORMAT: &[FormatItem] =
    format_description!("[year]-[month]-[day]-[hour]:[minute]");

/// Language requested from the geocoder unless configured otherwise.
pub const DEFAULT_LANGUAGE: &str = "zh-CN";

/// Upper bound on a single reverse-geocoding request.
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// How a file is put at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Copy,
    Move,
}

/// Everything a run needs, built once and handed to the organizer.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Label used for every file instead of a geocoded one.
    pub fixed_location: Option<String>,
    pub ledger_path: PathBuf,
    pub language: String,
    pub geocode_timeout: Duration,
    pub placement: Placement,
    pub dry_run: bool,
    /// Offset applied to filesystem timestamps.
    pub local_offset: UtcOffset,
}

impl OrganizerConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        OrganizerConfig {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            fixed_location: None,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILENAME),
            language: DEFAULT_LANGUAGE.to_string(),
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
            placement: Placement::Copy,
            dry_run: false,
            local_offset: get_local_offset(),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Placed(PathBuf),
    /// Content already recorded in the ledger.
    Duplicate,
    /// Something already exists at the computed destination.
    AlreadyPresent(PathBuf),
    /// Dry run: where the file would have gone.
    Planned(PathBuf),
}

/// Statistics from an organize run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeStats {
    pub images_placed: usize,
    pub videos_placed: usize,
    pub duplicates_skipped: usize,
    pub already_present: usize,
    pub planned: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl std::fmt::Display for OrganizeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} images, {} videos placed ({} duplicates skipped, {} already present, {} failed)",
            self.images_placed,
            self.videos_placed,
            self.duplicates_skipped,
            self.already_present,
            self.failed
        )
    }
}

/// Classifies files and moves them into the dated output tree.
pub struct Organizer {
    config: OrganizerConfig,
    extractor: MetadataExtractor,
    times: TimeResolver,
    locations: LocationResolver,
    cancel: Option<Arc<AtomicBool>>,
}

impl Organizer {
    /// Organizer backed by `ffprobe` and the public Nominatim service.
    pub fn new(config: OrganizerConfig) -> Result<Self> {
        let geocoder = NominatimGeocoder::new(config.geocode_timeout)?;
        Ok(Self::with_collaborators(
            config,
            Box::new(Ffprobe::default()),
            Box::new(geocoder),
        ))
    }

    pub fn with_collaborators(
        config: OrganizerConfig,
        probe: Box<dyn VideoProbe>,
        geocoder: Box<dyn Geocoder>,
    ) -> Self {
        let locations = LocationResolver::new(
            config.fixed_location.clone(),
            geocoder,
            config.language.clone(),
        );
        Organizer {
            extractor: MetadataExtractor::new(probe),
            times: TimeResolver::new(config.local_offset),
            locations,
            cancel: None,
            config,
        }
    }

    /// Stop before the next file once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Load the ledger, organize every file under the input directory and
    /// save the ledger again, including when the run is cut short.
    pub fn run(&self) -> Result<OrganizeStats> {
        let input = &self.config.input_dir;
        if !input.is_dir() {
            return Err(TimesortError::NotADirectory(input.clone()));
        }

        let mut ledger = DedupLedger::load(&self.config.ledger_path);
        let result = self.run_with_ledger(&mut ledger);
        if !self.config.dry_run {
            ledger.persist()?;
        }
        result
    }

    pub fn run_with_ledger(&self, ledger: &mut DedupLedger) -> Result<OrganizeStats> {
        let input = &self.config.input_dir;
        if !input.is_dir() {
            return Err(TimesortError::NotADirectory(input.clone()));
        }
        if !self.config.dry_run {
            fs::create_dir_all(&self.config.output_dir)?;
        }

        log::info!("Scanning {}", input.display());
        let files: Vec<MediaFile> = discover_files(input)
            .filter_map(|path| {
                let file = MediaFile::from_path(&path);
                if file.is_none() {
                    log::debug!("Skipping unsupported file: {}", path.display());
                }
                file
            })
            .collect();
        log::info!("Found {} media files", files.len());

        let bar = ProgressBar::new(files.len() as u64).with_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("Organizing");

        let mut stats = OrganizeStats::default();
        let mut planned: HashSet<ContentDigest> = HashSet::new();

        for file in &files {
            if self.is_cancelled() {
                log::warn!("Cancelled, stopping before {}", file.path.display());
                stats.cancelled = true;
                break;
            }

            match self.process_file(file, ledger, &mut planned) {
                Ok(FileOutcome::Placed(dest)) => {
                    log::info!("Placed {} -> {}", file.path.display(), dest.display());
                    match file.kind {
                        MediaKind::Image => stats.images_placed += 1,
                        MediaKind::Video => stats.videos_placed += 1,
                    }
                }
                Ok(FileOutcome::Duplicate) => {
                    log::info!("Skipping duplicate: {}", file.path.display());
                    stats.duplicates_skipped += 1;
                }
                Ok(FileOutcome::AlreadyPresent(dest)) => {
                    log::info!(
                        "Destination already exists, skipping {}: {}",
                        file.path.display(),
                        dest.display()
                    );
                    stats.already_present += 1;
                }
                Ok(FileOutcome::Planned(dest)) => {
                    log::info!("Would place {} -> {}", file.path.display(), dest.display());
                    bar.suspend(|| println!("{} -> {}", file.path.display(), dest.display()));
                    stats.planned += 1;
                }
                Err(e) => {
                    log::warn!("Failed to organize {}: {}", file.path.display(), e);
                    stats.failed += 1;
                }
            }
            bar.inc(1);
        }

        bar.finish_with_message("Done");
        log::info!("Organize complete: {}", stats);
        Ok(stats)
    }

    /// Classify one file and place it, consulting and updating the ledger.
    pub fn process_file(
        &self,
        file: &MediaFile,
        ledger: &mut DedupLedger,
        planned: &mut HashSet<ContentDigest>,
    ) -> Result<FileOutcome> {
        let digest = hash_file(&file.path)?;
        if ledger.contains(&digest) || planned.contains(&digest) {
            return Ok(FileOutcome::Duplicate);
        }

        let bag = self.extractor.extract(file);
        let timestamp = self.times.resolve(&file.path, &bag)?;
        let coordinates = resolve_coordinates(&bag);
        let location = self.locations.resolve(coordinates);
        log::debug!(
            "{}: time {} from {}, coordinates {:?}, location {}",
            file.path.display(),
            timestamp.datetime,
            timestamp.source,
            coordinates,
            location
        );

        let destination = destination_path(
            &self.config.output_dir,
            file.kind,
            &timestamp,
            &digest,
            &location,
            &file.extension,
        )?;

        if self.config.dry_run {
            planned.insert(digest);
            return Ok(FileOutcome::Planned(destination));
        }

        if let Some(dir) = destination.parent() {
            fs::create_dir_all(dir)?;
        }
        if destination.exists() {
            return Ok(FileOutcome::AlreadyPresent(destination));
        }

        place_file(&file.path, &destination, self.config.placement)?;
        ledger.record(&digest, &destination);
        Ok(FileOutcome::Placed(destination))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// `{year}年度/{year}-{month}/{kind}` under `output_dir`.
pub fn destination_dir(
    output_dir: &Path,
    kind: MediaKind,
    datetime: &PrimitiveDateTime,
) -> Result<PathBuf> {
    Ok(output_dir
        .join(format!("{}年度", datetime.year()))
        .join(datetime.format(MONTH_DIR_FORMAT)?)
        .join(kind.folder_label()))
}

/// `{YYYY-MM-DD-HH:MM}_{digest8}_{location}.{ext}`
pub fn destination_file_name(
    datetime: &PrimitiveDateTime,
    digest: &ContentDigest,
    location: &LocationLabel,
    extension: &str,
) -> Result<String> {
    Ok(format!(
        "{}_{}_{}.{}",
        datetime.format(FILE_NAME_DATE_FORMAT)?,
        digest.short(),
        location.file_component(),
        extension
    ))
}

/// Full destination of a file; the same inputs always give the same path.
pub fn destination_path(
    output_dir: &Path,
    kind: MediaKind,
    timestamp: &ResolvedTimestamp,
    digest: &ContentDigest,
    location: &LocationLabel,
    extension: &str,
) -> Result<PathBuf> {
    let dir = destination_dir(output_dir, kind, &timestamp.datetime)?;
    Ok(dir.join(destination_file_name(
        &timestamp.datetime,
        digest,
        location,
        extension,
    )?))
}

/// Put `source` at `destination`.
pub fn place_file(source: &Path, destination: &Path, placement: Placement) -> Result<()> {
    let placed = match placement {
        Placement::Copy => fs::copy(source, destination).map(|_| ()),
        // rename fails across filesystems; fall back to copy + remove
        Placement::Move => fs::rename(source, destination).or_else(|_| {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }),
    };
    placed.map_err(|error| TimesortError::PlacementFailed {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        error,
    })
}

/// Depth-first walk of `root` yielding regular files. Directory symlinks are
/// not followed.
pub fn discover_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("{}", TimesortError::Walkdir(e));
                None
            }
        })
        .filter(|entry| {
            let file_type = entry.file_type();
            file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
        })
        .map(|entry| entry.into_path())
}
