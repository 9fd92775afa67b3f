use crate::rates::RateOrigin;
use chrono::{DateTime, Local, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Result,
    Warning,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Result => style(text).green().bold(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn amount_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

pub fn flag_cell(present: bool) -> Cell {
    if present {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::DarkGrey)
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One line telling the user how current the rates behind a result are.
pub fn freshness_line(origin: RateOrigin, updated_at: Option<DateTime<Utc>>) -> String {
    let when = updated_at.map_or("never".to_string(), format_timestamp);
    match origin {
        RateOrigin::Live | RateOrigin::Cached => {
            style_text(&format!("Last updated: {when}"), StyleType::Subtle)
        }
        RateOrigin::Stale => style_text(
            &format!("Offline, using cached rates from {when}"),
            StyleType::Warning,
        ),
        RateOrigin::Default => style_text(
            "Offline, using built-in default rates",
            StyleType::Warning,
        ),
    }
}

/// Spinner shown while talking to the rate API.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_freshness_line_mentions_origin() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(freshness_line(RateOrigin::Cached, Some(ts)).contains("Last updated"));
        assert!(freshness_line(RateOrigin::Stale, Some(ts)).contains("cached rates from"));
        assert!(freshness_line(RateOrigin::Default, None).contains("default rates"));
        assert!(freshness_line(RateOrigin::Live, None).contains("never"));
    }
}
