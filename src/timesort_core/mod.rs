pub mod cli;
pub mod digest;
pub mod error;
pub mod filename_date;
pub mod gps;
pub mod ledger;
pub mod location;
pub mod media;
pub mod metadata;
pub mod organizer;
pub mod timestamp;

pub use cli::Cli;
pub use digest::{ContentDigest, hash_file};
pub use error::{Result, TimesortError};
pub use ledger::DedupLedger;
pub use location::{Geocoder, LocationLabel, NominatimGeocoder, UNKNOWN_LOCATION};
pub use media::{MediaFile, MediaKind};
pub use metadata::{Ffprobe, MetadataBag, MetadataExtractor, VideoProbe};
pub use organizer::{OrganizeStats, Organizer, OrganizerConfig, Placement};
pub use timestamp::{ResolvedTimestamp, TimeResolver, get_local_offset};
