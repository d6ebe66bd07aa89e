use std::collections::{BTreeMap, BTreeSet};

use climate_insights::Variable;
use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fixed per-variable accents
// ---------------------------------------------------------------------------

pub fn variable_color(var: Variable) -> Color32 {
    match var {
        Variable::Temperature => Color32::from_rgb(0xff, 0x6b, 0x6b),
        Variable::Co2Emissions => Color32::from_rgb(0xa2, 0x9b, 0xfe),
        Variable::SeaLevelRise => Color32::from_rgb(0x00, 0xce, 0xc9),
        Variable::Precipitation => Color32::from_rgb(0x55, 0xef, 0xc4),
        Variable::Humidity => Color32::from_rgb(0xfd, 0xa0, 0x85),
        Variable::WindSpeed => Color32::from_rgb(0x43, 0xe9, 0x7b),
    }
}

// ---------------------------------------------------------------------------
// Diverging scale for correlations
// ---------------------------------------------------------------------------

fn linear(r: u8, g: u8, b: u8) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

/// Blue for -1, neutral grey for 0, red for +1; undefined is dark grey.
pub fn correlation_color(r: Option<f64>) -> Color32 {
    let Some(r) = r.filter(|r| r.is_finite()) else {
        return Color32::DARK_GRAY;
    };
    let neutral = linear(0x3a, 0x3a, 0x4a);
    let end = if r < 0.0 {
        linear(0x00, 0xb4, 0xd8)
    } else {
        linear(0xff, 0x6b, 0x6b)
    };
    let mixed = neutral.mix(end, r.abs().min(1.0) as f32);
    let out: Srgb<u8> = Srgb::<f32>::from_linear(mixed).into_format();
    Color32::from_rgb(out.red, out.green, out.blue)
}

// ---------------------------------------------------------------------------
// Color mapping: country → Color32
// ---------------------------------------------------------------------------

/// Maps country names to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the dataset's countries.
    pub fn new(countries: &BTreeSet<String>) -> Self {
        let palette = generate_palette(countries.len());
        let mapping: BTreeMap<String, Color32> = countries
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given country.
    pub fn color_for(&self, country: &str) -> Color32 {
        self.mapping
            .get(country)
            .copied()
            .unwrap_or(self.default_color)
    }
}
