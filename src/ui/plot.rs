use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::color::trace_color;
use crate::data::model::SpectrumKind;
use crate::state::{AppState, Page};

// ---------------------------------------------------------------------------
// Spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Margin added above and below the data, as a fraction of its range.
const Y_BUFFER: f64 = 0.05;

/// Render the page currently selected in `state`.
pub fn spectrum_plot(ui: &mut Ui, state: &AppState) {
    let page = state.page;
    let traces = state.traces(page);

    if traces.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(empty_hint(page));
        });
        return;
    }

    let value_name = if traces.iter().all(|(k, _)| *k == SpectrumKind::Absorption) {
        SpectrumKind::Absorption.value_name()
    } else {
        SpectrumKind::Emission.value_name()
    };

    // Y limits with a 5% buffer; flat or single-point data falls back to 0..1.
    let (y_min, y_max) = traces
        .iter()
        .filter_map(|(_, sp)| sp.value_range())
        .fold(None, |acc: Option<(f64, f64)>, (lo, hi)| match acc {
            Some((a, b)) => Some((a.min(lo), b.max(hi))),
            None => Some((lo, hi)),
        })
        .filter(|(lo, hi)| hi > lo)
        .map(|(lo, hi)| {
            let buffer = (hi - lo) * Y_BUFFER;
            (lo - buffer, hi + buffer)
        })
        .unwrap_or((0.0, 1.0));

    Plot::new(("spectrum_plot", page.title()))
        .legend(Legend::default())
        .x_axis_label("Wavelength (nm)")
        .y_axis_label(value_name)
        .include_y(y_min)
        .include_y(y_max)
        .label_formatter(move |_name, value| {
            format!("Wavelength: {:.2} nm, {value_name}: {:.2}", value.x, value.y)
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (kind, sp) in &traces {
                let points: PlotPoints = sp.points().map(|(x, y)| [x, y]).collect();
                let line = Line::new(points)
                    .name(kind.label())
                    .color(trace_color(*kind))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}

fn empty_hint(page: Page) -> &'static str {
    match page {
        Page::Emission => "Acquire an emission spectrum to display it here",
        Page::Background => "Acquire or load a dark background",
        Page::Absorption => "Acquire a reference, then an absorption spectrum",
    }
}
