//! Letterbox compositor.
//!
//! Scales a source picture uniformly into a fixed target box, centres it and
//! fills the uncovered border with white. The geometry lives in
//! [`LetterboxPlan`] so it can be checked without touching any pixels.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use muzhack_models::naming::derived_file_name;
use muzhack_models::ImageVariant;

use crate::error::{MediaError, MediaResult};

/// Fill colour for the area not covered by the scaled picture.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Placement of a scaled source inside a target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterboxPlan {
    pub target_width: u32,
    pub target_height: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl LetterboxPlan {
    /// Compute where a `source_width` x `source_height` picture lands in the target box.
    ///
    /// A source that is relatively wider than the target spans the full width
    /// and is centred vertically; otherwise it spans the full height and is
    /// centred horizontally. Scaled sizes are truncated before the offsets are
    /// derived from them, so opposite paddings differ by at most one pixel.
    pub fn compute(
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> MediaResult<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(MediaError::invalid_image(format!(
                "degenerate source size {}x{}",
                source_width, source_height
            )));
        }
        if target_width == 0 || target_height == 0 {
            return Err(MediaError::invalid_image(format!(
                "degenerate target size {}x{}",
                target_width, target_height
            )));
        }

        let (sw, sh) = (source_width as u64, source_height as u64);
        let (tw, th) = (target_width as u64, target_height as u64);

        // sw / sh > tw / th, cross-multiplied to stay exact
        let source_is_wider = sw * th > tw * sh;

        let (scaled_width, scaled_height) = if source_is_wider {
            (tw, tw * sh / sw)
        } else {
            (th * sw / sh, th)
        };
        // Extreme ratios can truncate to zero; keep at least one pixel row/column.
        let scaled_width = scaled_width.clamp(1, tw) as u32;
        let scaled_height = scaled_height.clamp(1, th) as u32;

        let (offset_x, offset_y) = if source_is_wider {
            (0, (target_height - scaled_height) / 2)
        } else {
            ((target_width - scaled_width) / 2, 0)
        };

        Ok(Self {
            target_width,
            target_height,
            scaled_width,
            scaled_height,
            offset_x,
            offset_y,
        })
    }

    pub fn padding_left(&self) -> u32 {
        self.offset_x
    }

    pub fn padding_right(&self) -> u32 {
        self.target_width - self.offset_x - self.scaled_width
    }

    pub fn padding_top(&self) -> u32 {
        self.offset_y
    }

    pub fn padding_bottom(&self) -> u32 {
        self.target_height - self.offset_y - self.scaled_height
    }
}

/// A decoded source picture together with the format it was stored in.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

impl SourceImage {
    /// Decode a picture from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> MediaResult<Self> {
        let format = image::guess_format(bytes).ok();
        let image = match format {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .map_err(|e| MediaError::invalid_image(e.to_string()))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(MediaError::invalid_image("image has zero width or height"));
        }

        Ok(Self { image, format })
    }

    /// Decode a picture from a file.
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// A derived picture written next to its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedImage {
    pub variant: ImageVariant,
    pub path: PathBuf,
}

/// Letterbox `image` into the variant's target box.
pub fn letterbox(image: &DynamicImage, variant: &ImageVariant) -> MediaResult<RgbaImage> {
    let plan = LetterboxPlan::compute(image.width(), image.height(), variant.width, variant.height)?;
    debug!(
        suffix = variant.suffix,
        scaled_width = plan.scaled_width,
        scaled_height = plan.scaled_height,
        offset_x = plan.offset_x,
        offset_y = plan.offset_y,
        "Letterboxing picture into {}x{}",
        variant.width,
        variant.height
    );

    let scaled = image
        .resize_exact(plan.scaled_width, plan.scaled_height, FilterType::Lanczos3)
        .to_rgba8();

    let mut canvas = RgbaImage::from_pixel(variant.width, variant.height, BACKGROUND);
    imageops::replace(&mut canvas, &scaled, plan.offset_x as i64, plan.offset_y as i64);
    Ok(canvas)
}

/// Path of the derived file for `source_path` and `suffix`.
pub fn derived_path(source_path: &Path, suffix: &str) -> PathBuf {
    let file_name = source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    source_path.with_file_name(derived_file_name(&file_name, suffix))
}

/// Letterbox `source` into `variant` and write it next to `source_path`.
///
/// The output format follows the source file's extension, falling back to
/// the detected source format when the name has none.
pub fn compose_variant(
    source: &SourceImage,
    source_path: &Path,
    variant: &ImageVariant,
) -> MediaResult<PathBuf> {
    let output = derived_path(source_path, variant.suffix);
    let format = ImageFormat::from_path(&output)
        .ok()
        .or(source.format)
        .ok_or_else(|| MediaError::UnsupportedFormat(output.display().to_string()))?;

    let canvas = letterbox(&source.image, variant)?;
    save_canvas(canvas, &output, format)?;

    debug!("Saved {} variant to {}", variant.suffix, output.display());
    Ok(output)
}

/// Compose every variant in order.
pub fn compose_variants(
    source: &SourceImage,
    source_path: &Path,
    variants: &[ImageVariant],
) -> MediaResult<Vec<DerivedImage>> {
    variants
        .iter()
        .map(|variant| {
            compose_variant(source, source_path, variant).map(|path| DerivedImage {
                variant: *variant,
                path,
            })
        })
        .collect()
}

fn save_canvas(canvas: RgbaImage, path: &Path, format: ImageFormat) -> MediaResult<()> {
    let keeps_alpha = matches!(
        format,
        ImageFormat::Png
            | ImageFormat::Tiff
            | ImageFormat::Gif
            | ImageFormat::WebP
            | ImageFormat::Tga
            | ImageFormat::Ico
    );

    let result = if keeps_alpha {
        canvas.save_with_format(path, format)
    } else {
        DynamicImage::ImageRgba8(canvas)
            .to_rgb8()
            .save_with_format(path, format)
    };

    result.map_err(|e| MediaError::ImageEncode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
