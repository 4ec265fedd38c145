//! Artwork palette: dominant color extraction plus the colors derived from it.
//!
//! Extraction walks a downsampled grid of the image and sorts pixels into
//! eight buckets keyed on the top bit of each channel. Each bucket keeps an
//! alpha-weighted running sum, so transparent pixels do not count. Buckets
//! are averaged, ordered by weight (heaviest first, ties in bucket order) and
//! anything under 1% of the total weight is dropped. The result depends only
//! on the pixels.

use image::RgbaImage;

use crate::color::{best_contrast, text_color_for, Color, Harmonics};

/// Dominant color used when there is no artwork, or it could not be used.
pub const FALLBACK_DOMINANT: Color = Color::rgb(248, 236, 235);

/// Longest side of the sampling grid.
const DOWNSIZE_TO: f64 = 224.0;
/// Minimum share of total weight for a bucket to survive.
const SMALL_BUCKET: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    r: f64,
    g: f64,
    b: f64,
    weight: f64,
}

/// Extracts representative colors from `image`, most dominant first.
///
/// Returns an empty list for empty or fully transparent images.
pub fn extract_colors(image: &RgbaImage) -> Vec<Color> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let step_x = ((width as f64 / DOWNSIZE_TO) as usize).max(1);
    let step_y = ((height as f64 / DOWNSIZE_TO) as usize).max(1);

    let mut buckets = [Bucket::default(); 8];
    let mut total = 0.0;

    for y in (0..height).step_by(step_y) {
        for x in (0..width).step_by(step_x) {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            let idx = (((r >> 7) << 2) | ((g >> 7) << 1) | (b >> 7)) as usize;
            let weight = a as f64 / 255.0;

            let bucket = &mut buckets[idx];
            bucket.r += r as f64 * weight;
            bucket.g += g as f64 * weight;
            bucket.b += b as f64 * weight;
            bucket.weight += weight;
            total += weight;
        }
    }

    if total == 0.0 {
        return Vec::new();
    }

    let mut averaged: Vec<(Color, f64)> = buckets
        .iter()
        .filter(|b| b.weight > 0.0)
        .map(|b| {
            let avg = |sum: f64| (sum / b.weight).round().clamp(0.0, 255.0) as u8;
            (Color::rgb(avg(b.r), avg(b.g), avg(b.b)), b.weight)
        })
        .collect();

    // Stable sort keeps bucket order for equal weights.
    averaged.sort_by(|a, b| b.1.total_cmp(&a.1));

    averaged
        .into_iter()
        .filter(|(_, weight)| weight / total > SMALL_BUCKET)
        .map(|(color, _)| color)
        .collect()
}

/// Colors for one rendered snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub dominant: Color,
    /// Every color the extraction pass kept, dominant first. Empty for the
    /// fallback palette.
    pub extracted: Vec<Color>,
    /// Black or white, whichever contrasts best with `dominant`.
    pub text: Color,
    pub harmonics: Harmonics,
    /// Harmonic color with the best contrast against `dominant`, when accent
    /// selection is enabled.
    pub accent: Option<Color>,
}

impl Palette {
    pub fn from_dominant(dominant: Color, extracted: Vec<Color>, with_accent: bool) -> Self {
        let harmonics = Harmonics::of(&dominant);
        let accent = if with_accent {
            best_contrast(&dominant, &harmonics.candidates())
        } else {
            None
        };

        Self {
            dominant,
            extracted,
            text: text_color_for(&dominant),
            harmonics,
            accent,
        }
    }

    pub fn fallback(with_accent: bool) -> Self {
        Self::from_dominant(FALLBACK_DOMINANT, Vec::new(), with_accent)
    }

    pub fn from_image(image: &RgbaImage, with_accent: bool) -> Self {
        let extracted = extract_colors(image);
        match extracted.first() {
            Some(&dominant) => Self::from_dominant(dominant, extracted, with_accent),
            None => Self::fallback(with_accent),
        }
    }

    /// Color for the progress bar: the accent if selected, else the text color.
    pub fn progress_color(&self) -> Color {
        self.accent.unwrap_or(self.text)
    }
}
