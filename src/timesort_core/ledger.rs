use crate::timesort_core::digest::ContentDigest;
use crate::timesort_core::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default ledger filename, relative to the working directory.
pub const DEFAULT_LEDGER_FILENAME: &str = "media_config.json";

/// On-disk shape: `{"processed_md5": {"<digest>": "<destination>"}}`.
///
/// The key predates the switch to SHA-256 and is kept so existing ledgers load.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
struct LedgerFile {
    #[serde(default)]
    processed_md5: BTreeMap<String, String>,
}

/// Persistent digest -> destination mapping that gates reprocessing.
///
/// Unsaved entries are written back when the ledger is dropped, so a run that
/// stops early still keeps what it recorded.
#[derive(Debug)]
pub struct DedupLedger {
    path: Option<PathBuf>,
    records: LedgerFile,
    dirty: bool,
}

impl DedupLedger {
    /// Load the ledger at `path`. A missing or unreadable file starts an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<LedgerFile>(&bytes) {
                Ok(records) => {
                    log::info!(
                        "Loaded {} ledger entries from {}",
                        records.processed_md5.len(),
                        path.display()
                    );
                    records
                }
                Err(e) => {
                    log::warn!(
                        "Ledger {} is not valid, starting empty: {}",
                        path.display(),
                        e
                    );
                    LedgerFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No ledger at {}, starting empty", path.display());
                LedgerFile::default()
            }
            Err(e) => {
                log::warn!("Could not read ledger {}, starting empty: {}", path.display(), e);
                LedgerFile::default()
            }
        };

        DedupLedger {
            path: Some(path),
            records,
            dirty: false,
        }
    }

    /// A ledger with no backing file; `persist` is a no-op.
    pub fn in_memory() -> Self {
        DedupLedger {
            path: None,
            records: LedgerFile::default(),
            dirty: false,
        }
    }

    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.records.processed_md5.contains_key(digest.as_str())
    }

    /// Destination previously recorded for `digest`.
    pub fn destination(&self, digest: &ContentDigest) -> Option<&str> {
        self.records
            .processed_md5
            .get(digest.as_str())
            .map(String::as_str)
    }

    /// Record where `digest` was placed. An existing entry is never replaced;
    /// returns whether the entry was inserted.
    pub fn record(&mut self, digest: &ContentDigest, destination: &Path) -> bool {
        match self.records.processed_md5.entry(digest.as_str().to_string()) {
            Entry::Vacant(e) => {
                e.insert(destination.to_string_lossy().to_string());
                self.dirty = true;
                true
            }
            Entry::Occupied(e) => {
                log::debug!("Ledger already maps {} to {}", digest, e.get());
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.processed_md5.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.processed_md5.is_empty()
    }

    /// Write the whole mapping back, via a temporary file and rename.
    pub fn persist(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&temp_path, path)?;

        log::info!("Saved {} ledger entries to {}", self.len(), path.display());
        self.dirty = false;
        Ok(())
    }
}

impl Drop for DedupLedger {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.persist() {
                log::error!("Failed to save ledger: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn digest(hex: &str) -> ContentDigest {
        ContentDigest::from(hex.to_string())
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        let ledger = DedupLedger::load(temp.child("media_config.json").path());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_invalid_file_starts_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("media_config.json");
        file.write_str("{ this is not json").unwrap();
        assert!(DedupLedger::load(file.path()).is_empty());

        file.write_str(r#"{"processed_md5": ["wrong", "shape"]}"#).unwrap();
        assert!(DedupLedger::load(file.path()).is_empty());
    }

    #[test]
    fn test_record_never_overwrites() {
        let mut ledger = DedupLedger::in_memory();
        let d = digest("abcdef0123456789");
        assert!(ledger.record(&d, Path::new("/out/a.jpg")));
        assert!(!ledger.record(&d, Path::new("/out/b.jpg")));
        assert!(ledger.contains(&d));
        assert_eq!(ledger.destination(&d), Some("/out/a.jpg"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_persist_and_reload() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("state/media_config.json");

        let mut ledger = DedupLedger::load(file.path());
        ledger.record(&digest("aa11"), Path::new("/out/one.jpg"));
        ledger.record(&digest("bb22"), Path::new("/out/two.mp4"));
        ledger.persist().unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(json["processed_md5"]["aa11"], "/out/one.jpg");
        assert!(!temp.child("state/media_config.json.tmp").exists());

        let reloaded = DedupLedger::load(file.path());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.destination(&digest("bb22")), Some("/out/two.mp4"));
    }

    #[test]
    fn test_drop_saves_unsaved_entries() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("media_config.json");
        {
            let mut ledger = DedupLedger::load(file.path());
            ledger.record(&digest("cc33"), Path::new("/out/three.png"));
        }
        assert!(DedupLedger::load(file.path()).contains(&digest("cc33")));
    }

    #[test]
    fn test_panic_unwind_saves_recorded_entries() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("media_config.json");
        let path = file.path().to_path_buf();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut ledger = DedupLedger::load(&path);
            ledger.record(&digest("ee55"), Path::new("/out/five.jpg"));
            panic!("interrupted mid-run");
        }));
        assert!(outcome.is_err());
        assert!(DedupLedger::load(file.path()).contains(&digest("ee55")));
    }

    #[test]
    fn test_loads_existing_ledger_entries() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("media_config.json");
        file.write_str(r#"{"processed_md5": {"dd44": "output/2021年度/2021-10/图片/x.jpg"}}"#)
            .unwrap();
        let ledger = DedupLedger::load(file.path());
        assert!(ledger.contains(&digest("dd44")));
    }
}
