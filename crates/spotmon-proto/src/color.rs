//! Color primitives: sRGB colors, HSL conversion, hue rotation and WCAG
//! contrast.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An 8-bit sRGB color with alpha.
///
/// Serialises as a raw `[r, g, b]` channel triple; alpha is not part of the
/// wire format and deserialises as fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[u8; 3]", from = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn triple(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Comma-joined channel string, e.g. `"248,236,235"`, ready for CSS `rgba()`.
    pub fn rgb_string(&self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }

    pub fn to_hsl(&self) -> Hsl {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let delta = max - min;
        let s = if l < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        let mut h = if max == r {
            (g - b) / delta
        } else if max == g {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };
        h *= 60.0;
        if h < 0.0 {
            h += 360.0;
        }

        Hsl { h, s, l }
    }

    pub fn from_hsl(hsl: Hsl, alpha: u8) -> Self {
        let Hsl { h, s, l } = hsl;
        let h = h.rem_euclid(360.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let sector = h / 60.0;
        let x = c * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
        let (r1, g1, b1) = match sector as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;

        Self::rgba(channel(r1 + m), channel(g1 + m), channel(b1 + m), alpha)
    }

    /// Rotates the hue by `degrees` (modulo 360), keeping saturation,
    /// lightness and alpha.
    pub fn rotate_hue(&self, degrees: f64) -> Self {
        let mut hsl = self.to_hsl();
        hsl.h = (hsl.h + degrees).rem_euclid(360.0);
        Self::from_hsl(hsl, self.a)
    }

    /// WCAG 2.x relative luminance in `0.0..=1.0`.
    pub fn relative_luminance(&self) -> f64 {
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({})", self.rgb_string())
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.triple()
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color::rgb(r, g, b)
    }
}

/// Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

fn channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn linearize(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Contrast ratio between two colors, `(L_light + 0.05) / (L_dark + 0.05)`.
/// Symmetric, ranges from 1.0 (identical) to 21.0 (black on white).
pub fn contrast_ratio(a: &Color, b: &Color) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (light, dark) = if la > lb { (la, lb) } else { (lb, la) };
    (light + 0.05) / (dark + 0.05)
}

/// Picks the candidate with the highest contrast against `base`.
///
/// Ties keep the earliest candidate. Returns `None` only for an empty slice.
pub fn best_contrast(base: &Color, candidates: &[Color]) -> Option<Color> {
    let mut best: Option<(Color, f64)> = None;
    for candidate in candidates {
        let ratio = contrast_ratio(base, candidate);
        match best {
            Some((_, best_ratio)) if ratio <= best_ratio => {}
            _ => best = Some((*candidate, ratio)),
        }
    }
    best.map(|(color, _)| color)
}

/// Black or white, whichever reads better on `background`.
pub fn text_color_for(background: &Color) -> Color {
    best_contrast(background, &[Color::BLACK, Color::WHITE]).unwrap_or(Color::BLACK)
}

// ── Harmonics ─────────────────────────────────────────────────────────────────

/// Colors derived from a base color by fixed hue rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harmonics {
    /// +180°
    pub complementary: Color,
    /// +30°, -30°
    pub analogous: [Color; 2],
    /// +120°, +240°
    pub triadic: [Color; 2],
}

impl Harmonics {
    pub fn of(base: &Color) -> Self {
        Self {
            complementary: base.rotate_hue(180.0),
            analogous: [base.rotate_hue(30.0), base.rotate_hue(-30.0)],
            triadic: [base.rotate_hue(120.0), base.rotate_hue(240.0)],
        }
    }

    /// Accent candidates in selection order: triadic, analogous, complementary.
    pub fn candidates(&self) -> [Color; 5] {
        [
            self.triadic[0],
            self.triadic[1],
            self.analogous[0],
            self.analogous[1],
            self.complementary,
        ]
    }
}
