use super::ui;
use crate::core::{CurrencyCode, Settings};
use crate::{App, SettingsUpdate};
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Applies `update` on top of `current`. Rejects an unknown currency or a
/// zero refresh interval.
pub fn apply_update(current: &Settings, update: SettingsUpdate) -> Result<Settings> {
    let mut next = current.clone();
    if let Some(code) = update.base_currency {
        next.base_currency = code
            .parse::<CurrencyCode>()
            .with_context(|| format!("Unknown currency: {code}"))?;
    }
    if let Some(auto) = update.auto_update {
        next.auto_update = auto;
    }
    if let Some(minutes) = update.update_interval_minutes {
        if minutes == 0 {
            anyhow::bail!("Update interval must be at least one minute");
        }
        next.update_interval_minutes = minutes;
    }
    Ok(next)
}

fn settings_table(settings: &Settings) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Setting"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Base currency"),
        Cell::new(settings.base_currency.as_str()),
    ]);
    table.add_row(vec![
        Cell::new("Auto update"),
        ui::flag_cell(settings.auto_update),
    ]);
    table.add_row(vec![
        Cell::new("Update interval"),
        Cell::new(format!("{} min", settings.update_interval_minutes)),
    ]);
    table.to_string()
}

pub async fn run(app: &App, update: SettingsUpdate) -> Result<()> {
    let changed = update != SettingsUpdate::default();
    let settings = apply_update(&app.settings, update)?;

    if changed {
        settings
            .save(&app.store)
            .await
            .context("Failed to save settings")?;
        println!("{}", ui::style_text("Settings saved.", ui::StyleType::Result));
    }
    println!("{}", settings_table(&settings));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Settings {
        Settings {
            base_currency: "USD".parse().unwrap(),
            auto_update: true,
            update_interval_minutes: 30,
        }
    }

    #[test]
    fn test_apply_update_changes_only_given_fields() {
        let next = apply_update(
            &current(),
            SettingsUpdate {
                base_currency: Some("gbp".to_string()),
                update_interval_minutes: Some(60),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(next.base_currency.as_str(), "GBP");
        assert!(next.auto_update);
        assert_eq!(next.update_interval_minutes, 60);
    }

    #[test]
    fn test_apply_update_rejects_bad_values() {
        let bad_code = SettingsUpdate {
            base_currency: Some("DOLLARS".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&current(), bad_code).is_err());

        let zero_interval = SettingsUpdate {
            update_interval_minutes: Some(0),
            ..Default::default()
        };
        assert!(apply_update(&current(), zero_interval).is_err());
    }

    #[test]
    fn test_settings_table_shows_values() {
        let rendered = settings_table(&current());
        assert!(rendered.contains("USD"));
        assert!(rendered.contains("30 min"));
        assert!(rendered.contains("yes"));
    }
}
