use super::ui;
use crate::App;
use crate::core::currency::SUPPORTED_CURRENCIES;
use crate::core::{ConvertResult, CurrencyCode, RateSnapshot, RateTable};
use crate::rates::RateOrigin;
use anyhow::{Context, Result};
use comfy_table::{Cell, Color};
use futures::future::join_all;
use std::sync::Arc;

fn currency_table(base: &CurrencyCode, table: &RateTable) -> String {
    let mut out = ui::new_styled_table();
    out.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("In table"),
        ui::header_cell(&format!("Rate from {base}")),
    ]);

    for code in SUPPORTED_CURRENCIES {
        let Ok(code) = CurrencyCode::new(code) else {
            continue;
        };
        let rate = match table.get(base, &code) {
            Some(rate) => Cell::new(format!("{rate:.4}")),
            None => Cell::new("N/A").fg(Color::DarkGrey),
        };
        out.add_row(vec![
            Cell::new(code.as_str()),
            ui::flag_cell(table.mentions(&code)),
            rate,
        ]);
    }
    out.to_string()
}

/// Lists the supported currencies and whether the held table for the base
/// currency covers them. Uses the default table when nothing is held. Does not
/// touch the network.
pub async fn currencies(app: &App) -> Result<()> {
    let base = &app.settings.base_currency;
    let table = match app.rates.snapshot(base).await {
        Some(snapshot) => snapshot.table.clone(),
        None => {
            println!("{}", ui::freshness_line(RateOrigin::Default, None));
            app.rates.default_rates()
        }
    };

    println!("{}", currency_table(base, &table));
    println!(
        "{}",
        ui::style_text(
            &format!("{} supported currencies", SUPPORTED_CURRENCIES.len()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

/// Force-refreshes each base currency concurrently. Defaults to the
/// configured base currency.
pub async fn refresh(app: &App, bases: &[String]) -> Result<()> {
    let bases = if bases.is_empty() {
        vec![app.settings.base_currency.clone()]
    } else {
        bases
            .iter()
            .map(|b| {
                b.parse::<CurrencyCode>()
                    .with_context(|| format!("Unknown currency: {b}"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let pb = ui::new_spinner("Fetching exchange rates...");
    let results: Vec<(CurrencyCode, ConvertResult<Arc<RateSnapshot>>)> =
        join_all(bases.iter().map(|base| async move {
            (base.clone(), app.rates.refresh(base).await)
        }))
        .await;
    pb.finish_and_clear();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Base"),
        ui::header_cell("Rates"),
        ui::header_cell("Updated"),
    ]);

    let mut failures = 0;
    for (base, result) in &results {
        match result {
            Ok(snapshot) => table.add_row(vec![
                Cell::new(base.as_str()),
                Cell::new(snapshot.table.len()),
                Cell::new(ui::format_timestamp(snapshot.fetched_at)),
            ]),
            Err(e) => {
                failures += 1;
                table.add_row(vec![
                    Cell::new(base.as_str()),
                    Cell::new("N/A").fg(Color::Red),
                    Cell::new(e.to_string()).fg(Color::Red),
                ])
            }
        };
    }
    println!("{table}");

    if failures > 0 {
        anyhow::bail!("Failed to refresh {failures} of {} base currencies", results.len());
    }
    Ok(())
}
