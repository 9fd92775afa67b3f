use super::ui;
use crate::App;
use crate::converter::HistoryEntry;
use anyhow::Result;
use comfy_table::Cell;

fn history_table(entries: &[HistoryEntry]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("When"),
        ui::header_cell("Amount"),
        ui::header_cell("From"),
        ui::header_cell("Converted"),
        ui::header_cell("To"),
    ]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(ui::format_timestamp(entry.timestamp)),
            ui::amount_cell(entry.amount),
            Cell::new(entry.from.as_str()),
            ui::amount_cell(entry.converted),
            Cell::new(entry.to.as_str()),
        ]);
    }
    table.to_string()
}

pub async fn run(app: &App, clear: bool) -> Result<()> {
    if clear {
        app.converter.clear_history().await;
        println!("Conversion history cleared.");
        return Ok(());
    }

    let entries = app.converter.history().await;
    if entries.is_empty() {
        println!("No conversion history found.");
        return Ok(());
    }

    println!(
        "{}\n",
        ui::style_text("Recent Conversions", ui::StyleType::Title)
    );
    println!("{}", history_table(&entries));
    Ok(())
}
