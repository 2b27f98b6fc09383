use std::collections::BTreeMap;
use std::sync::Arc;

use eframe::egui::{self, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Plot, PlotPoints, Points};

use crate::data::model::PickupTable;
use crate::data::present::{
    column_projection, grid_bins, map_points, value_frequencies, ClusterPoint, NYC_OVERVIEW,
};
use crate::state::AppState;

/// Grid cell used by the aggregated pickup map, roughly the 200 m radius of
/// the original hexagon layer.
const MAP_CELL_DEG: f64 = 0.004;

// ---------------------------------------------------------------------------
// Central panel: chart sections, top to bottom
// ---------------------------------------------------------------------------

/// Render every chart section from the current state. Sections read their
/// exact view as arguments; none of them mutates anything.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let table = match &state.table {
        Some(t) => t,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No dataset loaded — see the status line above.");
            });
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if state.show_raw {
                ui.heading("Raw data");
                raw_table(ui, table);
                ui.separator();
            }

            ui.heading("Number of pickups by hour");
            hour_histogram(ui, &state.hour_histogram);
            ui.separator();

            ui.heading("2D map of all pickups");
            all_pickups_map(ui, &state.all_points);
            ui.separator();

            let title = match state.predicate().date {
                Some(d) => format!("3D map of pickups at {}:00 on {d}", state.hour),
                None => format!("3D map of pickups at {}:00", state.hour),
            };
            ui.heading(title);
            filtered_map(ui, table, &state.filtered);
            ui.separator();

            if let Some(col) = &state.selected_column {
                ui.heading(format!("You selected: {col}"));
                column_section(ui, table, col);
                ui.separator();
            }

            ui.heading("Pickup locations by dispatch base");
            cluster_chart(ui, state);
        });
}

// ---------------------------------------------------------------------------
// Raw data table
// ---------------------------------------------------------------------------

fn raw_table(ui: &mut Ui, table: &PickupTable) {
    ui.push_id("raw_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .columns(Column::auto().resizable(true), table.columns.len())
            .min_scrolled_height(0.0)
            .max_scroll_height(260.0)
            .header(20.0, |mut header| {
                for col in &table.columns {
                    header.col(|ui| {
                        ui.strong(col);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, table.len(), |mut row| {
                    let row_idx = row.index();
                    for col in &table.columns {
                        let text = table
                            .cell(row_idx, col)
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        row.col(|ui| {
                            ui.label(text);
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Hour histogram
// ---------------------------------------------------------------------------

fn hour_histogram(ui: &mut Ui, buckets: &[u64; 24]) {
    let bars: Vec<Bar> = buckets
        .iter()
        .enumerate()
        .map(|(h, &count)| Bar::new(h as f64 + 0.5, count as f64).width(0.9))
        .collect();

    Plot::new("hour_histogram")
        .height(220.0)
        .x_axis_label("hour of day")
        .y_axis_label("pickups")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("pickups / hour"));
        });
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

fn all_pickups_map(ui: &mut Ui, points: &[[f64; 2]]) {
    let pts: PlotPoints = points.iter().copied().collect();

    Plot::new("all_pickups_map")
        .height(320.0)
        .data_aspect(1.0)
        .x_axis_label("lon")
        .y_axis_label("lat")
        .show(ui, |plot_ui| {
            plot_ui.points(Points::new(pts).radius(1.0).name("pickups"));
        });
}

/// 2D stand-in for the original extruded hexagon deck: aggregated cells are
/// drawn with a radius scaled by their count, under the raw scatter.
fn filtered_map(ui: &mut Ui, table: &PickupTable, indices: &[usize]) {
    let bins = grid_bins(table, indices, MAP_CELL_DEG);
    let scatter: PlotPoints = map_points(table, indices).into_iter().collect();

    let view = NYC_OVERVIEW;
    let span = view.half_span_deg();

    Plot::new("filtered_map")
        .height(320.0)
        .data_aspect(1.0)
        .x_axis_label("lon")
        .y_axis_label("lat")
        .include_x(view.lon - span)
        .include_x(view.lon + span)
        .include_y(view.lat - span)
        .include_y(view.lat + span)
        .show(ui, |plot_ui| {
            for bin in &bins {
                let radius = 3.0 + (bin.count as f32).sqrt();
                plot_ui.points(
                    Points::new(vec![[bin.lon, bin.lat]])
                        .radius(radius)
                        .color(egui::Color32::from_rgba_unmultiplied(230, 120, 20, 110)),
                );
            }
            plot_ui.points(
                Points::new(scatter)
                    .radius(1.5)
                    .color(egui::Color32::from_rgba_unmultiplied(200, 30, 0, 160))
                    .name("pickups"),
            );
        });
}

// ---------------------------------------------------------------------------
// Selected column: projection table + frequency chart for numeric domains
// ---------------------------------------------------------------------------

fn column_section(ui: &mut Ui, table: &PickupTable, column: &str) {
    let Some(values) = column_projection(table, column) else {
        ui.label("Column not present in the table.");
        return;
    };

    ui.push_id("column_projection", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::remainder())
            .min_scrolled_height(0.0)
            .max_scroll_height(200.0)
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong(column);
                });
            })
            .body(|body| {
                body.rows(18.0, values.len(), |mut row| {
                    let text = values[row.index()].to_string();
                    row.col(|ui| {
                        ui.label(text);
                    });
                });
            });
    });

    // Non-numeric domains get no frequency chart; that is not an error.
    let Some(freqs) = value_frequencies(table, column) else {
        return;
    };

    ui.add_space(8.0);
    ui.strong("Value frequencies");
    let bars: Vec<Bar> = freqs
        .iter()
        .filter_map(|(value, count)| {
            value
                .as_f64()
                .map(|x| Bar::new(x, *count as f64).width(0.8))
        })
        .collect();

    Plot::new("value_frequencies")
        .height(200.0)
        .x_axis_label(column.to_owned())
        .y_axis_label("count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(column));
        });
}

// ---------------------------------------------------------------------------
// Clustered scatter by dispatch base
// ---------------------------------------------------------------------------

fn cluster_chart(ui: &mut Ui, state: &AppState) {
    // Group points by base so the legend doubles as the cluster key.
    let mut groups: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for p in state.clusters.iter() {
        groups.entry(p.base.as_str()).or_default().push([p.lon, p.lat]);
    }

    let hover_index: Arc<Vec<ClusterPoint>> = Arc::clone(&state.clusters);

    Plot::new("cluster_chart")
        .height(380.0)
        .data_aspect(1.0)
        .x_axis_label("lon")
        .y_axis_label("lat")
        .legend(Legend::default())
        .label_formatter(move |name, value| {
            match nearest_point(&hover_index, value.x, value.y) {
                Some(p) => format!(
                    "{}\n{}\nhour {}",
                    p.base,
                    p.when.format("%m/%d/%Y %H:%M:%S"),
                    p.hour()
                ),
                None => format!("{name}\n{:.4}, {:.4}", value.x, value.y),
            }
        })
        .show(ui, |plot_ui| {
            for (base, pts) in groups {
                let name = if base.is_empty() { "(no base)" } else { base };
                let points: PlotPoints = pts.into_iter().collect();
                plot_ui.points(
                    Points::new(points)
                        .radius(1.5)
                        .color(state.base_colors.color_for(base))
                        .name(name),
                );
            }
        });
}

/// Closest cluster point to the pointer, if it is within a small window.
fn nearest_point(points: &[ClusterPoint], lon: f64, lat: f64) -> Option<&ClusterPoint> {
    const MAX_DIST_DEG: f64 = 0.002;
    points
        .iter()
        .map(|p| {
            let d2 = (p.lon - lon).powi(2) + (p.lat - lat).powi(2);
            (p, d2)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, d2)| *d2 <= MAX_DIST_DEG * MAX_DIST_DEG)
        .map(|(p, _)| p)
}
