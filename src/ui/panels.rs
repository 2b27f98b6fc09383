use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{filtered_indices, FilterPredicate};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top status / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.label(RichText::new("Uber pickups in NYC").strong());
        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} pickups loaded, {} match filter",
                table.len(),
                state.filtered.len()
            ));
        } else {
            ui.label("No data loaded.");
        }

        ui.separator();

        ui.label("rows:");
        ui.add(
            egui::DragValue::new(&mut state.row_limit)
                .range(1..=1_000_000)
                .speed(100),
        );
        if ui.button("Reload").clicked() {
            // Same limit hits the cache; a new limit fetches once.
            state.load_dataset();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the control panel. Every interaction re-derives the filtered
/// view from the widget values; nothing mutates the table itself.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    if ui.checkbox(&mut state.show_raw, "Show raw data").changed() {
        state.on_interaction();
    }
    ui.separator();

    // ---- Date input (optional) ----
    ui.strong("Date input");
    ui.horizontal(|ui: &mut Ui| {
        if ui.checkbox(&mut state.date_enabled, "").changed() {
            state.on_interaction();
        }
        ui.add_enabled_ui(state.date_enabled, |ui: &mut Ui| {
            if ui
                .add(DatePickerButton::new(&mut state.date_buffer).id_salt("pickup_date"))
                .changed()
            {
                state.on_interaction();
            }
        });
    });
    if state.date_enabled {
        ui.label(format!("Date input is: {}", state.date_buffer));
    } else {
        ui.label("No date restriction.");
    }
    ui.separator();

    // ---- Hour slider ----
    ui.strong("Hour filter");
    if ui
        .add(egui::Slider::new(&mut state.hour, 0..=23).text("hour"))
        .changed()
    {
        state.on_interaction();
    }

    // The metric counts by hour alone, date restriction ignored.
    if let Some(table) = &state.table {
        let hour_only = FilterPredicate {
            hour: state.hour,
            date: None,
            column: None,
        };
        let count = filtered_indices(table, &hour_only).len();
        ui.label(format!("Pickups this hour: {count}"));
    }
    ui.separator();

    // ---- Column selector ----
    ui.strong("Select data column");
    let columns: Vec<String> = state
        .table
        .as_ref()
        .map(|t| t.columns.clone())
        .unwrap_or_default();

    let selected_text = state
        .selected_column
        .clone()
        .unwrap_or_else(|| "Select a column…".to_string());
    egui::ComboBox::from_id_salt("column_select")
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(state.selected_column.is_none(), "(none)")
                .clicked()
            {
                state.selected_column = None;
                state.on_interaction();
            }
            for col in &columns {
                let is_selected = state.selected_column.as_deref() == Some(col);
                if ui.selectable_label(is_selected, col).clicked() {
                    state.selected_column = Some(col.clone());
                    state.on_interaction();
                }
            }
        });
    ui.separator();

    ui.label(format!(
        "This page has run {} times.",
        state.session.visits()
    ));
}
