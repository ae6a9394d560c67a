//! Derived picture variants.

use serde::Serialize;

/// A fixed target size a source picture is letterboxed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ImageVariant {
    /// Suffix inserted before the file extension (`photo-thumb.jpg`)
    pub suffix: &'static str,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
}

impl ImageVariant {
    pub const fn new(suffix: &'static str, width: u32, height: u32) -> Self {
        Self {
            suffix,
            width,
            height,
        }
    }

    /// Target aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Explore view card
pub const EXPLORE: ImageVariant = ImageVariant::new("explore", 218, 172);
/// Thumbnail
pub const THUMB: ImageVariant = ImageVariant::new("thumb", 100, 82);
/// Main project picture
pub const MAIN: ImageVariant = ImageVariant::new("main", 500, 409);

/// Variants produced for every picture, in production order.
pub const PICTURE_VARIANTS: [ImageVariant; 3] = [EXPLORE, THUMB, MAIN];
