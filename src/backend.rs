//! File system and decoding collaborators of the image cache

use image::RgbaImage;
use std::path::Path;
use std::time::SystemTime;

/// Source of file modification times.
///
/// `None` means the file does not exist or cannot be queried. Because
/// `None < Some(_)`, a file that appears after a failed load makes the
/// cached entry stale.
pub trait FileClock {
    fn modified(&self, path: &Path) -> Option<SystemTime>;
}

/// Reads modification times straight from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl FileClock for SystemClock {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

/// Decodes encoded image bytes into RGBA pixels.
///
/// Implementations return `None` for unsupported or corrupt input and must
/// never panic.
pub trait ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<RgbaImage>;
}

/// Decoder backed by the `image` crate, guessing the format from content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<RgbaImage> {
        let image = image::load_from_memory(bytes).ok()?.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(image)
    }
}
