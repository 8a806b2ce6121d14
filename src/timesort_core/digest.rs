use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when streaming a file through the hasher.
const CHUNK_SIZE: usize = 8192;

/// Number of hex characters of the digest embedded in destination file names.
pub const SHORT_DIGEST_LEN: usize = 8;

/// Hex-encoded SHA-256 of a file's full byte content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used in destination file names.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_DIGEST_LEN.min(self.0.len())]
    }
}

impl From<String> for ContentDigest {
    fn from(hex: String) -> Self {
        ContentDigest(hex)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calculate the SHA-256 digest of the file at `path`, reading it in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<ContentDigest, io::Error> {
    let file = fs::File::open(path)?;
    hash_reader(file)
}

/// Digest everything readable from `reader`.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<ContentDigest, io::Error> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentDigest(format!("{:x}", hasher.finalize())))
}
