use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

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
// Color mapping: dispatch base id → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct dispatch base ids to distinct colours so the clustered
/// scatter chart groups visually by base.
#[derive(Debug, Clone)]
pub struct BaseColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl BaseColorMap {
    /// Build a colour map from the set of base ids present in the table.
    pub fn new(bases: &BTreeSet<String>) -> Self {
        let palette = generate_palette(bases.len());
        let mapping: BTreeMap<String, Color32> = bases
            .iter()
            .zip(palette.into_iter())
            .map(|(b, c): (&String, Color32)| (b.clone(), c))
            .collect();

        BaseColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a base id.
    pub fn color_for(&self, base: &str) -> Color32 {
        self.mapping
            .get(base)
            .copied()
            .unwrap_or(self.default_color)
    }
}
