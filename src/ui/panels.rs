use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use climate_insights::Variable;

use crate::color::variable_color;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    // Clone the session handle so state can be mutated below.
    let Some(session) = state.session.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    let dataset = &session.dataset;

    // ---- Year range ----
    if let Some((first, last)) = dataset.year_bounds() {
        ui.strong("Year range");
        let (mut lo, mut hi) = (state.filter.year_min, state.filter.year_max);
        ui.add(egui::Slider::new(&mut lo, first..=last).text("from"));
        ui.add(egui::Slider::new(&mut hi, first..=last).text("to"));
        state.set_year_range(lo, hi);
        ui.separator();
    }

    // ---- Primary variable ----
    ui.strong("Variable");
    variable_picker(ui, "primary_variable", "", &mut state.variable);
    ui.separator();

    // ---- Countries ----
    let n_selected = state.filter.countries.len();
    let n_total = dataset.countries().len();
    let header_text = if n_selected == 0 {
        format!("Countries  (all {n_total})")
    } else {
        format!("Countries  ({n_selected}/{n_total})")
    };

    let mut toggled = None;
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("countries")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("All").clicked() {
                state.select_all_countries();
            }
            ScrollArea::vertical()
                .auto_shrink([false, true])
                .max_height((ui.available_height() - 20.0).max(120.0))
                .show(ui, |ui: &mut Ui| {
                    for country in dataset.countries() {
                        let mut text = RichText::new(country);
                        if let Some(cm) = &state.color_map {
                            text = text.color(cm.color_for(country));
                        }
                        let mut checked = state.filter.countries.contains(country);
                        if ui.checkbox(&mut checked, text).changed() {
                            toggled = Some(country.clone());
                        }
                    }
                });
        });

    if let Some(country) = toggled {
        state.toggle_country(&country);
    }
}

/// Combo box over the six measurements.
pub fn variable_picker(ui: &mut Ui, id: &str, label: &str, current: &mut Variable) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(RichText::new(current.label()).color(variable_color(*current)))
        .show_ui(ui, |ui: &mut Ui| {
            for var in Variable::ALL {
                ui.selectable_value(current, var, var.label());
            }
        });
    if !label.is_empty() {
        ui.label(label);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Export filtered CSV…").clicked() {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!(
                "{} records across {} countries, {} visible",
                session.dataset.len(),
                session.dataset.countries().len(),
                state.view.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Dataset-wide figures for the current filter.
pub fn kpi_row(ui: &mut Ui, state: &mut AppState) {
    let records = state.view.len();
    let countries = state.view.countries().len();

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for var in [
            Variable::Temperature,
            Variable::Co2Emissions,
            Variable::SeaLevelRise,
        ] {
            let value = match state.memo.summary(&state.view, var).into_ready() {
                Some(s) => format!("{:.2} ± {:.2}", s.mean, s.std.unwrap_or(0.0)),
                None => "n/a".to_string(),
            };
            metric_card(ui, &format!("Avg {}", var.label()), &value, variable_color(var));
        }
        metric_card(ui, "Records", &records.to_string(), Color32::LIGHT_BLUE);
        metric_card(ui, "Countries", &countries.to_string(), Color32::LIGHT_BLUE);
    });
}

pub fn metric_card(ui: &mut Ui, title: &str, value: &str, accent: Color32) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(150.0);
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(title).small().color(Color32::GRAY));
            ui.label(RichText::new(value).size(20.0).strong().color(accent));
        });
    });
}

pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.title());
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name("climate_data_filtered.csv")
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match state.export_filtered(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
