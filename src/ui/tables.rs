use eframe::egui::{self, Align, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use climate_insights::Variable;

use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Virtualized table of the filtered rows.
pub fn data_explorer(ui: &mut Ui, state: &AppState) {
    let rows = state.view.observations();
    egui::CollapsingHeader::new(
        RichText::new(format!("Data Explorer  ({} rows)", rows.len())).strong(),
    )
    .id_salt("data_explorer")
    .default_open(false)
    .show(ui, |ui: &mut Ui| {
        ui.push_id("data_explorer_table", |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .cell_layout(Layout::left_to_right(Align::Center))
                .column(Column::initial(150.0).at_least(90.0))
                .column(Column::initial(160.0).at_least(90.0))
                .columns(Column::initial(110.0).at_least(60.0), Variable::COUNT)
                .max_scroll_height(360.0)
                .header(20.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("Date");
                    });
                    header.col(|ui| {
                        ui.strong("Country");
                    });
                    for var in Variable::ALL {
                        header.col(|ui| {
                            ui.strong(var.label());
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                        let obs = &rows[row.index()];
                        row.col(|ui| {
                            ui.label(obs.date_text.as_str());
                        });
                        row.col(|ui| {
                            ui.label(obs.country.as_str());
                        });
                        for var in Variable::ALL {
                            row.col(|ui| {
                                ui.label(cell(obs.value(var)));
                            });
                        }
                    });
                });
        });
    });
}

/// Descriptive statistics of every measurement over the filtered rows.
pub fn summary_table(ui: &mut Ui, state: &mut AppState) {
    let summaries: Vec<_> = Variable::ALL
        .iter()
        .map(|&var| (var, state.memo.summary(&state.view, var).into_ready()))
        .collect();

    egui::CollapsingHeader::new(RichText::new("Statistical Summary").strong())
        .id_salt("statistical_summary")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            const HEADERS: [&str; 9] =
                ["Variable", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];
            ui.push_id("summary_table", |ui: &mut Ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .cell_layout(Layout::left_to_right(Align::Center))
                    .column(Column::initial(140.0).at_least(100.0))
                    .columns(Column::initial(90.0).at_least(60.0), HEADERS.len() - 1)
                    .vscroll(false)
                    .header(20.0, |mut header| {
                        for title in HEADERS {
                            header.col(|ui| {
                                ui.strong(title);
                            });
                        }
                    })
                    .body(|mut body| {
                        for (var, summary) in &summaries {
                            body.row(ROW_HEIGHT, |mut row| {
                                row.col(|ui| {
                                    ui.label(var.label());
                                });
                                let cells = match summary {
                                    Some(s) => [
                                        s.count.to_string(),
                                        cell(Some(s.mean)),
                                        cell(s.std),
                                        cell(Some(s.min)),
                                        cell(Some(s.q25)),
                                        cell(Some(s.median)),
                                        cell(Some(s.q75)),
                                        cell(Some(s.max)),
                                    ],
                                    None => std::array::from_fn(|i| {
                                        if i == 0 { "0".to_string() } else { String::new() }
                                    }),
                                };
                                for text in cells {
                                    row.col(|ui| {
                                        ui.label(text);
                                    });
                                }
                            });
                        }
                    });
            });
        });
}
