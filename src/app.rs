use eframe::egui::{self, Color32, RichText};

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ClimateInsightsApp {
    pub state: AppState,
}

impl ClimateInsightsApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for ClimateInsightsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Without a dataset there is nothing to explore.
        if let Some(error) = &self.state.fatal_error {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.heading("Climate Insights");
                    ui.add_space(12.0);
                    ui.label(RichText::new(error).color(Color32::RED));
                });
            });
            return;
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, charts, tables ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    panels::kpi_row(ui, &mut self.state);
                    ui.separator();
                    panels::tab_bar(ui, &mut self.state);
                    ui.add_space(6.0);

                    match self.state.tab {
                        Tab::Trends => plot::trends_tab(ui, &mut self.state),
                        Tab::Correlation => plot::correlation_tab(ui, &mut self.state),
                        Tab::Countries => plot::countries_tab(ui, &mut self.state),
                        Tab::Distributions => plot::distributions_tab(ui, &mut self.state),
                        Tab::Prediction => plot::prediction_tab(ui, &mut self.state),
                    }

                    ui.separator();
                    tables::data_explorer(ui, &self.state);
                    tables::summary_table(ui, &mut self.state);
                });
        });
    }
}
