use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use log::Level;

use crate::acquisition::session::Action;
use crate::data::export::ExportMode;
use crate::data::model::{Spectrum, SpectrumKind};
use crate::state::{AppState, Page};

// ---------------------------------------------------------------------------
// Left side panel – acquisition controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Acquisition");
    let capture = state.session.capture();
    let device = if capture.is_demo() {
        RichText::new(capture.device_name()).color(Color32::YELLOW)
    } else {
        RichText::new(capture.device_name())
    };
    ui.label(device);
    ui.separator();

    let busy = state.loading();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.add_enabled_ui(!busy, |ui: &mut Ui| {
                capture_settings(ui, state);
                ui.add_space(6.0);
                capture_buttons(ui, state);
            });

            if let Some(action) = state.worker.current() {
                ui.add_space(4.0);
                ui.horizontal(|ui: &mut Ui| {
                    ui.spinner();
                    ui.label(format!("Capturing {}…", action.label()));
                    if ui.button("Cancel").clicked() {
                        state.worker.cancel();
                    }
                });
            }

            ui.separator();
            ui.add_enabled_ui(!busy, |ui: &mut Ui| export_controls(ui, state));

            ui.separator();
            ui.strong("Session");
            ui.label(format!("State: {}", state.session.store().state().label()));
            session_table(ui, state);
        });
}

fn capture_settings(ui: &mut Ui, state: &mut AppState) {
    egui::Grid::new("capture_settings")
        .num_columns(2)
        .spacing([8.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            let settings = &mut state.settings;

            ui.label("Integration time (ms)");
            ui.add(
                egui::DragValue::new(&mut settings.integration_time_ms)
                    .range(0.001..=60_000.0)
                    .speed(1.0),
            );
            ui.end_row();

            ui.label("Interval (s)");
            ui.add(
                egui::DragValue::new(&mut settings.interval_s)
                    .range(0.0..=3_600.0)
                    .speed(0.1),
            );
            ui.end_row();

            ui.label("Average scans");
            ui.add(egui::DragValue::new(&mut settings.average_scans).range(1..=1_000));
            ui.end_row();
        });
}

fn capture_buttons(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for action in [
            Action::Background,
            Action::Reference,
            Action::Emission,
            Action::Absorption,
        ] {
            if ui.button(action.label()).clicked() {
                state.request(action);
            }
        }
    });
}

fn export_controls(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        let current = state.settings.export_mode;
        egui::ComboBox::from_id_salt("export_mode")
            .selected_text(current.label())
            .show_ui(ui, |ui: &mut Ui| {
                for mode in ExportMode::ALL {
                    if ui.selectable_label(current == mode, mode.label()).clicked() {
                        state.set_export_mode(mode);
                    }
                }
            });
        if ui.button("Save…").clicked() {
            save_file_dialog(state);
        }
    });
    if ui.button("Reset").clicked() {
        state.reset();
    }
}

/// Points, min and max of every stored spectrum.
fn session_table(ui: &mut Ui, state: &AppState) {
    let store = state.session.store();
    let rows: [(SpectrumKind, Option<&Spectrum>); 4] = [
        (SpectrumKind::Background, store.background()),
        (SpectrumKind::Reference, store.reference()),
        (SpectrumKind::Emission, store.last_raw()),
        (SpectrumKind::Absorption, store.absorption()),
    ];

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .columns(Column::remainder(), 3)
        .header(18.0, |mut header| {
            for title in ["Spectrum", "Points", "Min", "Max"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (kind, spectrum) in rows {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.label(short_name(kind));
                    });
                    let (points, lo, hi) = match spectrum.and_then(|sp| {
                        sp.value_range().map(|(lo, hi)| (sp.len(), lo, hi))
                    }) {
                        Some((n, lo, hi)) => {
                            (n.to_string(), format!("{lo:.3}"), format!("{hi:.3}"))
                        }
                        None => ("–".into(), "–".into(), "–".into()),
                    };
                    for text in [points, lo, hi] {
                        row.col(|ui: &mut Ui| {
                            ui.label(text);
                        });
                    }
                });
            }
        });
}

fn short_name(kind: SpectrumKind) -> &'static str {
    match kind {
        SpectrumKind::Background => "Background",
        SpectrumKind::Reference => "Reference",
        SpectrumKind::Emission | SpectrumKind::EmissionMinusBackground => "Emission (raw)",
        SpectrumKind::Absorption => "Absorption",
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / page selector.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Save spectrum…").clicked() {
                save_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load background…").clicked() {
                open_file_dialog(state, SpectrumKind::Background);
                ui.close_menu();
            }
            if ui.button("Load reference…").clicked() {
                open_file_dialog(state, SpectrumKind::Reference);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Reset").clicked() {
                state.reset();
                ui.close_menu();
            }
        });

        ui.separator();

        for page in Page::ALL {
            if ui.selectable_label(state.page == page, page.title()).clicked() {
                state.page = page;
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Bottom bar – progress and status
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.add(
            egui::ProgressBar::new(state.progress)
                .desired_width(180.0)
                .show_percentage(),
        );
        if let Some(status) = &state.status_message {
            let color = match status.level {
                Level::Error => Color32::RED,
                Level::Warn => Color32::YELLOW,
                _ => ui.visuals().text_color(),
            };
            ui.label(RichText::new(&status.text).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn save_file_dialog(state: &mut AppState) {
    if state.loading() {
        return;
    }
    let file: Option<PathBuf> = rfd::FileDialog::new()
        .set_title("Save Spectra")
        .add_filter("Text Files", &["txt"])
        .add_filter("All Files", &["*"])
        .save_file();

    if let Some(path) = file {
        state.request_export(path);
    }
}

fn open_file_dialog(state: &mut AppState, kind: SpectrumKind) {
    let file = rfd::FileDialog::new()
        .set_title(format!("Load {kind}"))
        .add_filter("Supported files", &["txt", "tsv", "json", "parquet", "pq"])
        .add_filter("Text", &["txt", "tsv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_from_file(kind, &path);
    }
}
