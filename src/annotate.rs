// Image statistics extractor
//
// brightness = mean grayscale intensity / 255
// contrast   = population std-dev of grayscale intensity / 255
// saturation = mean HSV saturation
// All values rounded to 2 decimals. "weight" is the historical key for width.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GenericImageView, ImageReader};
use palette::{Hsv, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::config::AnnotationVariant;
use crate::constants::STAT_DECIMALS;
use crate::error::{MoodBenchError, Result};
use crate::storage::StorageLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub height: u32,
    #[serde(rename = "weight")]
    pub width: u32,
    pub brightness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
}

impl AnnotationRecord {
    /// Drop the extended fields when only the basic record is wanted.
    pub fn with_variant(mut self, variant: AnnotationVariant) -> Self {
        if variant == AnnotationVariant::Basic {
            self.contrast = None;
            self.saturation = None;
        }
        self
    }
}

/// Compute the full record for one stored image.
pub fn extract(image_path: &Path) -> Result<AnnotationRecord> {
    // Sniff the format from content; the extension is not trusted
    let image = ImageReader::open(image_path)?.with_guessed_format()?.decode()?;
    let (width, height) = image.dimensions();
    let pixel_count = width as f64 * height as f64;
    if pixel_count == 0.0 {
        return Err(MoodBenchError::Annotation(format!(
            "empty image: {}",
            image_path.display()
        )));
    }

    let gray = image.to_luma8();
    let mean = gray.pixels().map(|p| p[0] as f64).sum::<f64>() / pixel_count;
    let variance = gray
        .pixels()
        .map(|p| {
            let d = p[0] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / pixel_count;

    let saturation = image
        .to_rgb8()
        .pixels()
        .map(|p| {
            let hsv: Hsv = Srgb::new(p[0], p[1], p[2]).into_format::<f32>().into_color();
            hsv.saturation as f64
        })
        .sum::<f64>()
        / pixel_count;

    Ok(AnnotationRecord {
        height,
        width,
        brightness: round_stat(mean / 255.0),
        contrast: Some(round_stat(variance.sqrt() / 255.0)),
        saturation: Some(round_stat(saturation)),
    })
}

/// Extract and write the record next to its image in the annotation tree.
/// Overwrites any earlier record.
pub fn annotate_image(
    layout: &StorageLayout,
    image_path: &Path,
    variant: AnnotationVariant,
) -> Result<PathBuf> {
    let record = extract(image_path)?.with_variant(variant);
    let out_path = layout.annotation_path_for(image_path)?;
    write_annotation(&out_path, &record)?;
    Ok(out_path)
}

pub fn write_annotation(path: &Path, record: &AnnotationRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_annotation(path: &Path) -> Result<AnnotationRecord> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn round_stat(value: f64) -> f64 {
    let factor = 10f64.powi(STAT_DECIMALS);
    (value * factor).round() / factor
}
