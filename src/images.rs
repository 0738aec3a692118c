//! Image source resolution.
//!
//! Image blocks only carry a reference string.  An [`ImageResolver`] turns that
//! reference into decoded pixels, or reports it as unavailable so the layout
//! engine can substitute a placeholder.  Pixel dimensions double as intrinsic
//! sizes in points, so a 640 px wide screenshot is 640 pt wide before scaling.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::GenericImageView;

use crate::model::ImageBlock;

/// Decoded RGB pixels shared between placements and sinks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    rgb: Arc<Vec<u8>>,
}

impl ImageData {
    /// Wraps an RGB8 buffer; returns `None` when its length does not match the size.
    pub fn from_rgb(width: u32, height: u32, rgb: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        (rgb.len() == expected).then(|| Self {
            width,
            height,
            rgb: Arc::new(rgb),
        })
    }

    /// An image filled with a single color.
    pub fn solid(width: u32, height: u32, color: crate::style::Color) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            rgb.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Self {
            width,
            height,
            rgb: Arc::new(rgb),
        }
    }

    /// Converts a decoded image into RGB pixels.
    pub fn from_dynamic(image: &image::DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgb: Arc::new(image.to_rgb8().into_raw()),
        }
    }

    /// Rebuilds a `DynamicImage` for encoders that need one.
    pub fn to_dynamic(&self) -> Option<image::DynamicImage> {
        image::RgbImage::from_raw(self.width, self.height, self.rgb.as_ref().clone())
            .map(image::DynamicImage::ImageRgb8)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB8 bytes, row by row.
    pub fn pixels(&self) -> &[u8] {
        &self.rgb
    }
}

/// Non-fatal signal that an image reference could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUnavailable {
    reference: String,
    reason: String,
}

impl ImageUnavailable {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// The reference that failed to resolve.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ImageUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image `{}` unavailable: {}", self.reference, self.reason)
    }
}

impl std::error::Error for ImageUnavailable {}

/// Text substituted for an image whose source cannot be resolved.
pub fn missing_image_text(reference: &str) -> String {
    format!("[Missing image: {reference}]")
}

/// Capability that resolves image references.
pub trait ImageResolver {
    /// Loads the pixels behind `reference`.
    fn resolve(&self, reference: &str) -> Result<ImageData, ImageUnavailable>;

    /// Pixel dimensions behind `reference`, without necessarily decoding it.
    fn dimensions(&self, reference: &str) -> Result<(u32, u32), ImageUnavailable> {
        self.resolve(reference)
            .map(|data| (data.width(), data.height()))
    }
}

impl<T: ImageResolver + ?Sized> ImageResolver for &T {
    fn resolve(&self, reference: &str) -> Result<ImageData, ImageUnavailable> {
        (**self).resolve(reference)
    }

    fn dimensions(&self, reference: &str) -> Result<(u32, u32), ImageUnavailable> {
        (**self).dimensions(reference)
    }
}

/// Builds an image block whose intrinsic size is read from the resolver.
pub fn probe_image<R: ImageResolver + ?Sized>(
    resolver: &R,
    reference: &str,
    max_width: f64,
) -> Result<ImageBlock, ImageUnavailable> {
    let (width, height) = resolver.dimensions(reference)?;
    if width == 0 || height == 0 {
        return Err(ImageUnavailable::new(
            reference,
            format!("image has degenerate size {width}x{height}"),
        ));
    }
    Ok(ImageBlock::new(
        reference,
        f64::from(width),
        f64::from(height),
        max_width,
    ))
}

/// Loads an image from the given path using the [`image`] crate.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, String> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .map_err(|err| format!("failed to open image file {}: {err}", path.display()))?;
    reader
        .with_guessed_format()
        .map_err(|err| format!("unable to determine image format: {err}"))?
        .decode()
        .map_err(|err| format!("failed to decode image file {}: {err}", path.display()))
}

/// Loads an image from in-memory bytes using the [`image`] crate.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<image::DynamicImage, String> {
    image::load_from_memory(bytes.as_ref())
        .map_err(|err| format!("failed to decode image from provided bytes: {err}"))
}

/// Resolves references as paths relative to a base directory.
#[derive(Clone, Debug)]
pub struct FsImageResolver {
    root: PathBuf,
}

impl FsImageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, reference: &str) -> Result<PathBuf, ImageUnavailable> {
        let path = self.root.join(reference);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ImageUnavailable::new(
                reference,
                format!("no file at {}", path.display()),
            ))
        }
    }
}

impl ImageResolver for FsImageResolver {
    fn resolve(&self, reference: &str) -> Result<ImageData, ImageUnavailable> {
        let path = self.locate(reference)?;
        let decoded =
            decode_image_from_path(&path).map_err(|err| ImageUnavailable::new(reference, err))?;
        Ok(ImageData::from_dynamic(&decoded))
    }

    fn dimensions(&self, reference: &str) -> Result<(u32, u32), ImageUnavailable> {
        let path = self.locate(reference)?;
        image::image_dimensions(&path).map_err(|err| {
            ImageUnavailable::new(
                reference,
                format!("failed to read size of {}: {err}", path.display()),
            )
        })
    }
}

/// Serves images registered in memory; every other reference is unavailable.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageResolver {
    images: BTreeMap<String, ImageData>,
}

impl MemoryImageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers pixels under `reference`.
    pub fn insert(&mut self, reference: impl Into<String>, data: ImageData) {
        self.images.insert(reference.into(), data);
    }

    /// Registers pixels and returns the updated resolver.
    pub fn with_image(mut self, reference: impl Into<String>, data: ImageData) -> Self {
        self.insert(reference, data);
        self
    }

    /// Decodes encoded image bytes (PNG, JPEG, ...) and registers them.
    pub fn insert_encoded(
        &mut self,
        reference: impl Into<String>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), ImageUnavailable> {
        let reference = reference.into();
        let decoded = decode_image_from_bytes(bytes)
            .map_err(|err| ImageUnavailable::new(reference.clone(), err))?;
        self.images
            .insert(reference, ImageData::from_dynamic(&decoded));
        Ok(())
    }
}

impl ImageResolver for MemoryImageResolver {
    fn resolve(&self, reference: &str) -> Result<ImageData, ImageUnavailable> {
        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| ImageUnavailable::new(reference, "not registered"))
    }
}
