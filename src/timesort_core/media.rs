use std::path::{Path, PathBuf};

/// Image file extensions (lowercase).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

/// Video file extensions (lowercase).
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// HEIF-family extensions, whose EXIF lives in the container's item table.
const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a lowercase extension. `None` means the file is not handled.
    pub fn from_extension(ext: &str) -> Option<MediaKind> {
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Directory token used in the output tree.
    pub fn folder_label(&self) -> &'static str {
        match self {
            MediaKind::Image => "图片",
            MediaKind::Video => "视频",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered file with a recognized extension.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Lowercase extension without the leading dot.
    pub extension: String,
}

impl MediaFile {
    /// Build a `MediaFile` when the extension is supported (case-insensitive).
    pub fn from_path(path: &Path) -> Option<MediaFile> {
        let extension = normalized_extension(path)?;
        let kind = MediaKind::from_extension(&extension)?;
        Some(MediaFile {
            path: path.to_path_buf(),
            kind,
            extension,
        })
    }

    /// Bare file name, no directory component.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub fn is_heif(&self) -> bool {
        HEIF_EXTENSIONS.contains(&self.extension.as_str())
    }
}

/// Lowercase extension of `path`, if it has one.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_image_extensions() {
        for name in ["photo.jpg", "photo.JPEG", "photo.png", "photo.HEIC"] {
            let file = MediaFile::from_path(Path::new(name)).unwrap();
            assert_eq!(file.kind, MediaKind::Image, "{name}");
        }
    }

    #[test]
    fn test_detect_video_extensions() {
        for name in ["clip.mp4", "clip.MOV", "clip.avi", "clip.mkv"] {
            let file = MediaFile::from_path(Path::new(name)).unwrap();
            assert_eq!(file.kind, MediaKind::Video, "{name}");
        }
    }

    #[test]
    fn test_unsupported_extensions() {
        assert!(MediaFile::from_path(Path::new("notes.txt")).is_none());
        assert!(MediaFile::from_path(Path::new("raw.cr2")).is_none());
        assert!(MediaFile::from_path(Path::new("no_extension")).is_none());
    }

    #[test]
    fn test_extension_is_lowercased() {
        let file = MediaFile::from_path(Path::new("/a/b/IMG_0001.JPG")).unwrap();
        assert_eq!(file.extension, "jpg");
        assert_eq!(file.file_name(), "IMG_0001.JPG");
        assert!(!file.is_heif());
        assert!(MediaFile::from_path(Path::new("x.Heic")).unwrap().is_heif());
    }

    #[test]
    fn test_folder_labels() {
        assert_eq!(MediaKind::Image.folder_label(), "图片");
        assert_eq!(MediaKind::Video.folder_label(), "视频");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
