use super::ui::{self, StyleType};
use crate::App;
use crate::converter::parse_amount;
use crate::core::CurrencyCode;
use anyhow::{Context, Result};

const DEFAULT_TARGET: &str = "EUR";

fn parse_code(text: &str) -> Result<CurrencyCode> {
    text.parse::<CurrencyCode>()
        .with_context(|| format!("Unknown currency: {text}"))
}

pub async fn run(
    app: &App,
    amount: &str,
    from: Option<&str>,
    to: Option<&str>,
    swap: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    let mut from = match from {
        Some(code) => parse_code(code)?,
        None => app.settings.base_currency.clone(),
    };
    let mut to = parse_code(to.unwrap_or(DEFAULT_TARGET))?;
    if swap {
        std::mem::swap(&mut from, &mut to);
    }

    let conversion = app.converter.convert_current(amount, &from, &to).await?;
    let entry = &conversion.entry;

    println!(
        "\n{:.2} {} = {}",
        entry.amount,
        entry.from,
        ui::style_text(
            &format!("{:.2} {}", entry.converted, entry.to),
            StyleType::Result
        )
    );
    println!(
        "Exchange Rate: 1 {} = {:.4} {}",
        entry.from, conversion.rate, entry.to
    );
    println!(
        "{}",
        ui::freshness_line(conversion.origin, conversion.rates_updated_at)
    );
    if let Some(err) = &conversion.refresh_error {
        println!("{}", ui::style_text(&err.to_string(), StyleType::Subtle));
    }
    Ok(())
}

pub async fn rate(app: &App, from: &str, to: &str) -> Result<()> {
    let from = parse_code(from)?;
    let to = parse_code(to)?;

    let view = app.rates.rates_or_fallback(&from).await;
    let rate = app.converter.rate(&from, &to, &view.table)?;

    println!("1 {from} = {} {to}", ui::style_text(&format!("{rate:.4}"), StyleType::Result));
    if from != to && !view.table.contains(&from, &to) {
        println!(
            "{}",
            ui::style_text(&format!("via {}", app.converter.pivot()), StyleType::Subtle)
        );
    }
    println!("{}", ui::freshness_line(view.origin, view.fetched_at));
    Ok(())
}
