use eframe::egui::{self, Align2, Color32, FontId, RichText, Sense, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, LineStyle, Plot, PlotPoint, Points,
    Text,
};

use climate_insights::analysis::{
    histogram, linear_trend, min_max_normalize, rank, CorrelationMatrix, CountryMean, Dimension, RankOrder,
    Summary,
};
use climate_insights::data::model::month_abbreviation;
use climate_insights::Variable;

use crate::color::{correlation_color, variable_color};
use crate::state::AppState;
use crate::ui::panels::{metric_card, variable_picker};

const CHART_HEIGHT: f32 = 260.0;
const HISTOGRAM_BINS: usize = 50;
const KDE_POINTS: usize = 200;
const SCATTER_SAMPLE: usize = 2000;
const SCATTER_SEED: u64 = 42;
const YEARS_SHOWN: usize = 6;

fn no_data(ui: &mut Ui) {
    ui.label(
        RichText::new("No data for the current filter")
            .italics()
            .color(Color32::GRAY),
    );
}

/// Label for integral axis marks only.
fn label_at<'a>(labels: impl Fn(i64) -> Option<&'a str>, value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 {
        return String::new();
    }
    labels(rounded as i64).unwrap_or_default().to_string()
}

fn box_elem(x: f64, s: &Summary, name: &str) -> BoxElem {
    BoxElem::new(x, BoxSpread::new(s.min, s.q25, s.median, s.q75, s.max))
        .name(name)
        .box_width(0.6)
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

pub fn trends_tab(ui: &mut Ui, state: &mut AppState) {
    let var = state.variable;
    let yearly_view = state
        .memo
        .group_mean(&state.view, Dimension::Year, &Variable::ALL);
    let Some(yearly) = yearly_view.ready() else {
        no_data(ui);
        return;
    };

    ui.heading(format!("Yearly average {var}"));
    let points: Vec<[f64; 2]> = yearly
        .series(var)
        .into_iter()
        .map(|(key, mean)| [key.as_f64(), mean])
        .collect();
    let trend = linear_trend(&points);
    let color = variable_color(var);

    Plot::new("yearly_trend")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("Year")
        .y_axis_label(var.label())
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points.clone()).name(var.label()).color(color).width(2.0));
            plot_ui.points(Points::new(points.clone()).radius(3.0).color(color));
            if let (Some(trend), Some(first), Some(last)) = (trend, points.first(), points.last()) {
                let ends = vec![[first[0], trend.at(first[0])], [last[0], trend.at(last[0])]];
                plot_ui.line(
                    Line::new(ends)
                        .name(format!("Trend ({:+.4} per year)", trend.slope))
                        .color(Color32::GRAY)
                        .style(LineStyle::dashed_loose()),
                );
            }
        });

    ui.add_space(8.0);
    ui.heading("All variables over time (normalized)");
    Plot::new("normalized_trends")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("Year")
        .include_y(0.0)
        .include_y(1.0)
        .show(ui, |plot_ui| {
            for v in Variable::ALL {
                let series = yearly.series(v);
                let means: Vec<f64> = series.iter().map(|(_, mean)| *mean).collect();
                let scaled: Vec<[f64; 2]> = series
                    .iter()
                    .zip(min_max_normalize(&means))
                    .map(|((key, _), y)| [key.as_f64(), y])
                    .collect();
                plot_ui.line(Line::new(scaled).name(v.label()).color(variable_color(v)));
            }
        });

    ui.add_space(8.0);
    ui.heading(format!("Monthly average {var}"));
    let monthly_view = state.memo.group_mean(&state.view, Dimension::Month, &[var]);
    let Some(monthly) = monthly_view.ready() else {
        no_data(ui);
        return;
    };
    let bars: Vec<Bar> = monthly
        .series(var)
        .into_iter()
        .map(|(key, mean)| Bar::new(key.as_f64(), mean).name(key.label()).width(0.7))
        .collect();

    Plot::new("monthly_pattern")
        .height(CHART_HEIGHT)
        .x_axis_formatter(|mark, _range| {
            label_at(|m| u32::try_from(m).ok().and_then(month_abbreviation), mark.value)
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(color).name(var.label()));
        });
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

pub fn correlation_tab(ui: &mut Ui, state: &mut AppState) {
    let Some(matrix) = state
        .memo
        .correlation_matrix(&state.view, &Variable::ALL)
        .into_ready()
    else {
        no_data(ui);
        return;
    };

    ui.heading("Correlation matrix");
    heatmap(ui, &matrix);

    ui.add_space(8.0);
    ui.heading("Strongest relationships");
    egui::Grid::new("correlation_pairs")
        .striped(true)
        .num_columns(4)
        .show(ui, |ui: &mut Ui| {
            ui.strong("Variable 1");
            ui.strong("Variable 2");
            ui.strong("r");
            ui.strong("Strength");
            ui.end_row();
            for pair in matrix.pairs() {
                ui.label(pair.first.label());
                ui.label(pair.second.label());
                ui.label(pair.r.map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}")));
                ui.label(pair.strength.to_string());
                ui.end_row();
            }
        });

    ui.add_space(8.0);
    scatter_explorer(ui, state);
}

fn heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let cell = egui::vec2(92.0, 34.0);
    egui::Grid::new("correlation_heatmap")
        .spacing([2.0, 2.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("");
            for col in &matrix.columns {
                ui.label(RichText::new(col.label()).small());
            }
            ui.end_row();

            for i in 0..matrix.size() {
                ui.label(RichText::new(matrix.columns[i].label()).small());
                for j in 0..matrix.size() {
                    let r = matrix.get(i, j);
                    let (rect, response) = ui.allocate_exact_size(cell, Sense::hover());
                    let painter = ui.painter();
                    painter.rect_filled(rect, 2.0, correlation_color(r));
                    painter.text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        r.map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}")),
                        FontId::proportional(13.0),
                        Color32::WHITE,
                    );
                    response.on_hover_text(format!(
                        "{} vs {}",
                        matrix.columns[i], matrix.columns[j]
                    ));
                }
                ui.end_row();
            }
        });
}

fn scatter_explorer(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Relationship explorer");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("X");
        variable_picker(ui, "scatter_x", "", &mut state.scatter_x);
        ui.label("Y");
        variable_picker(ui, "scatter_y", "", &mut state.scatter_y);
    });

    let (x_var, y_var) = (state.scatter_x, state.scatter_y);
    let Some(sample) = state
        .memo
        .paired_sample(&state.view, x_var, y_var, SCATTER_SAMPLE, SCATTER_SEED)
        .into_ready()
    else {
        no_data(ui);
        return;
    };
    let (x_min, x_max) = sample.x_range;

    Plot::new("scatter")
        .legend(Legend::default())
        .height(CHART_HEIGHT + 60.0)
        .x_axis_label(x_var.label())
        .y_axis_label(y_var.label())
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(sample.points)
                    .radius(2.0)
                    .color(variable_color(y_var).gamma_multiply(0.6))
                    .name(format!("{y_var} vs {x_var}")),
            );
            if let Some(trend) = sample.trend {
                plot_ui.line(
                    Line::new(vec![[x_min, trend.at(x_min)], [x_max, trend.at(x_max)]])
                        .name("OLS fit")
                        .color(Color32::WHITE)
                        .width(2.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

pub fn countries_tab(ui: &mut Ui, state: &mut AppState) {
    let var = state.variable;
    let k = state.config.top_k;
    let means = state.memo.country_means(&state.view, var);
    let (Some(top), Some(bottom)) = (
        rank(&means, k, RankOrder::Descending).into_ready(),
        rank(&means, k, RankOrder::Ascending).into_ready(),
    ) else {
        no_data(ui);
        return;
    };

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].heading(format!("Highest average {var}"));
        ranking_chart(&mut cols[0], "top_countries", &top, var);
        cols[1].heading(format!("Lowest average {var}"));
        ranking_chart(&mut cols[1], "bottom_countries", &bottom, var);
    });

    ui.add_space(8.0);
    comparison(ui, state);
}

/// Horizontal bars, first entry on top.
fn ranking_chart(ui: &mut Ui, id: &str, ranked: &[CountryMean], var: Variable) {
    let n = ranked.len();
    let bars: Vec<Bar> = ranked
        .iter()
        .enumerate()
        .map(|(i, c)| Bar::new((n - 1 - i) as f64, c.mean).name(&c.country).width(0.7))
        .collect();
    let names: Vec<String> = ranked.iter().rev().map(|c| c.country.clone()).collect();

    Plot::new(id)
        .height(CHART_HEIGHT.max(n as f32 * 20.0))
        .y_axis_formatter(move |mark, _range| {
            label_at(
                |i| usize::try_from(i).ok().and_then(|i| names.get(i)).map(String::as_str),
                mark.value,
            )
        })
        .x_axis_label(var.label())
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .horizontal()
                    .color(variable_color(var))
                    .name(var.label()),
            );
        });
}

/// Radar of the selected countries' normalized profiles.
fn comparison(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Country comparison");
    let Some(session) = state.session.clone() else {
        return;
    };

    let mut toggled = None;
    egui::ComboBox::from_id_salt("compare_countries")
        .selected_text(format!(
            "{} of {} selected",
            state.compare.len(),
            state.config.compare_cap
        ))
        .show_ui(ui, |ui: &mut Ui| {
            for country in session.dataset.countries() {
                let mut checked = state.compare.contains(country);
                if ui.checkbox(&mut checked, country.as_str()).changed() {
                    toggled = Some(country.clone());
                }
            }
        });
    if let Some(country) = toggled {
        state.toggle_compare(&country);
    }

    let columns = Variable::ALL;
    let mut profiles: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for country in &state.compare {
        if let Some(p) = state.memo.country_profile(&state.view, country, &columns).into_ready() {
            profiles.push((country.clone(), p));
        }
    }
    if profiles.is_empty() {
        no_data(ui);
        return;
    }

    let spoke = |i: usize| {
        let angle = std::f64::consts::TAU * i as f64 / columns.len() as f64;
        let (sin, cos) = angle.sin_cos();
        [sin, cos]
    };

    Plot::new("country_radar")
        .legend(Legend::default())
        .height(380.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, var) in columns.iter().enumerate() {
                let [x, y] = spoke(i);
                plot_ui.line(Line::new(vec![[0.0, 0.0], [x, y]]).color(Color32::DARK_GRAY));
                plot_ui.text(
                    Text::new(PlotPoint::new(1.15 * x, 1.15 * y), var.label())
                        .color(Color32::LIGHT_GRAY),
                );
            }
            for (country, profile) in &profiles {
                let mut outline: Vec<[f64; 2]> = profile
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let r = v.unwrap_or(0.0);
                        let [x, y] = spoke(i);
                        [r * x, r * y]
                    })
                    .collect();
                if let Some(first) = outline.first().copied() {
                    outline.push(first);
                }
                let color = state
                    .color_map
                    .as_ref()
                    .map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(country));
                plot_ui.line(Line::new(outline).name(country).color(color).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

pub fn distributions_tab(ui: &mut Ui, state: &mut AppState) {
    let var = state.variable;
    let Some(dist) = state
        .memo
        .distribution(&state.view, var, HISTOGRAM_BINS, KDE_POINTS)
        .into_ready()
    else {
        no_data(ui);
        return;
    };
    let hist = &dist.histogram;
    let kde = dist.density_as_counts();
    let color = variable_color(var);

    ui.heading(format!("Distribution of {var}"));
    let bars: Vec<Bar> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| Bar::new(hist.bin_center(i), count as f64).width(hist.bin_width))
        .collect();
    Plot::new("histogram")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label(var.label())
        .y_axis_label("Count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(color.gamma_multiply(0.7)).name("Count"));
            if let Some(curve) = kde {
                plot_ui.line(Line::new(curve).name("KDE").color(Color32::WHITE).width(2.0));
            }
        });

    ui.add_space(8.0);
    ui.heading("All variables (normalized)");
    let mut boxes: Vec<(Variable, BoxElem)> = Vec::new();
    for (i, &v) in Variable::ALL.iter().enumerate() {
        if let Some(s) = state.memo.normalized_summary(&state.view, v).into_ready() {
            boxes.push((v, box_elem(i as f64, &s, v.label())));
        }
    }
    Plot::new("normalized_boxes")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_formatter(|mark, _range| {
            label_at(
                |i| {
                    usize::try_from(i)
                        .ok()
                        .and_then(|i| Variable::ALL.get(i))
                        .map(|v| v.label())
                },
                mark.value,
            )
        })
        .show(ui, |plot_ui| {
            for (v, elem) in boxes {
                let accent = variable_color(v);
                plot_ui.box_plot(
                    BoxPlot::new(vec![elem
                        .fill(accent.gamma_multiply(0.4))
                        .stroke(Stroke::new(1.5, accent))])
                    .name(v.label())
                    .color(accent),
                );
            }
        });

    ui.add_space(8.0);
    ui.heading(format!("{var} by year"));
    let Some(yearly) = state
        .memo
        .yearly_summaries(&state.view, var, YEARS_SHOWN)
        .into_ready()
    else {
        no_data(ui);
        return;
    };
    Plot::new("yearly_boxes")
        .height(CHART_HEIGHT)
        .x_axis_label("Year")
        .y_axis_label(var.label())
        .show(ui, |plot_ui| {
            let elems = yearly
                .iter()
                .map(|(year, s)| box_elem(*year as f64, s, &year.to_string()))
                .collect();
            plot_ui.box_plot(BoxPlot::new(elems).color(color).name(var.label()));
        });
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

pub fn prediction_tab(ui: &mut Ui, state: &mut AppState) {
    let Some(session) = state.session.clone() else {
        return;
    };
    let outcome = match &session.fit {
        Ok(outcome) => outcome,
        Err(e) => {
            ui.label(RichText::new(format!("Model unavailable: {e}")).color(Color32::RED));
            return;
        }
    };
    let model = &outcome.model;
    let metrics = &outcome.metrics;
    let target = model.target();

    ui.heading(format!("Ridge regression for {target} (alpha = {})", model.alpha()));
    ui.horizontal_wrapped(|ui: &mut Ui| {
        let accent = variable_color(target);
        metric_card(ui, "MAE", &format!("{:.3}", metrics.mae), accent);
        metric_card(ui, "RMSE", &format!("{:.3}", metrics.rmse), accent);
        metric_card(ui, "R²", &format!("{:.3}", metrics.r2), accent);
        metric_card(
            ui,
            "Train / test rows",
            &format!("{} / {}", metrics.n_train, metrics.n_test),
            Color32::LIGHT_BLUE,
        );
    });

    let evaluation: Vec<[f64; 2]> = outcome
        .evaluation
        .iter()
        .map(|p| [p.actual, p.predicted])
        .collect();
    let (lo, hi) = evaluation
        .iter()
        .flat_map(|p| *p)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let residuals = histogram(&outcome.evaluation_residuals(), HISTOGRAM_BINS).into_ready();

    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].heading("Actual vs predicted (evaluation rows)");
        Plot::new("actual_vs_predicted")
            .legend(Legend::default())
            .height(CHART_HEIGHT)
            .x_axis_label("Actual")
            .y_axis_label("Predicted")
            .show(&mut cols[0], |plot_ui| {
                plot_ui.points(
                    Points::new(evaluation)
                        .radius(2.0)
                        .color(variable_color(target).gamma_multiply(0.6))
                        .name("Evaluation rows"),
                );
                if lo.is_finite() && hi.is_finite() {
                    plot_ui.line(
                        Line::new(vec![[lo, lo], [hi, hi]])
                            .name("Perfect prediction")
                            .color(Color32::GRAY)
                            .style(LineStyle::dashed_loose()),
                    );
                }
            });

        cols[1].heading("Residuals (evaluation rows)");
        match residuals {
            Some(hist) => {
                let bars: Vec<Bar> = hist
                    .counts
                    .iter()
                    .enumerate()
                    .map(|(i, &count)| {
                        Bar::new(hist.bin_center(i), count as f64).width(hist.bin_width)
                    })
                    .collect();
                Plot::new("residuals")
                    .height(CHART_HEIGHT)
                    .x_axis_label("Actual - predicted")
                    .show(&mut cols[1], |plot_ui| {
                        plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
                    });
            }
            None => no_data(&mut cols[1]),
        }
    });

    ui.add_space(8.0);
    ui.heading(format!("Predict {target}"));
    egui::Grid::new("prediction_inputs")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            for (feature, value) in model.features().iter().zip(state.prediction_inputs.iter_mut()) {
                ui.label(feature.label());
                ui.add(egui::DragValue::new(value).speed(0.1).max_decimals(3));
                ui.end_row();
            }
        });
    if ui.button("Predict").clicked() {
        state.predict();
    }
    match &state.prediction {
        Some(Ok(value)) => {
            ui.label(
                RichText::new(format!("Predicted {target}: {value:.2}"))
                    .size(20.0)
                    .strong()
                    .color(variable_color(target)),
            );
        }
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
        }
        None => {}
    }
}
