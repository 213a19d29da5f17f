use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::SpectrumKind;

// ---------------------------------------------------------------------------
// Trace colours
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Fixed colour per spectrum kind, bright enough for a dark plot background.
pub fn trace_color(kind: SpectrumKind) -> Color32 {
    match kind {
        SpectrumKind::Emission | SpectrumKind::EmissionMinusBackground => {
            hsl_to_color32(180.0, 1.0, 0.5) // cyan
        }
        SpectrumKind::Background => hsl_to_color32(60.0, 1.0, 0.5), // yellow
        SpectrumKind::Reference => hsl_to_color32(120.0, 0.75, 0.55),
        SpectrumKind::Absorption => hsl_to_color32(300.0, 0.75, 0.6),
    }
}
