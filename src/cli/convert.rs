use super::ui;
use crate::context::AppContext;
use crate::core::currency::Currency;
use crate::core::session::Snapshot;
use anyhow::Result;
use comfy_table::Cell;

impl Snapshot {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Amount"),
            ui::header_cell(&format!("Rate (1 {})", self.base)),
        ]);

        for conversion in &self.conversions {
            table.add_row(vec![
                Cell::new(conversion.currency),
                ui::amount_cell(&conversion.amount, conversion.rate.is_some()),
                ui::format_optional_cell(conversion.rate, |r| format!("{r}")),
            ]);
        }

        let mut output = format!(
            "{} {}\n\n",
            ui::style_text(&self.amount, ui::StyleType::Label),
            ui::style_text(self.base.code(), ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let footer = match (&self.refreshed_at, &self.last_batch) {
            (Some(at), Some(batch)) if batch.failed > 0 => ui::style_text(
                &format!(
                    "Rates as of {} ({} unavailable)",
                    at.format("%Y-%m-%d %H:%M:%S UTC"),
                    batch.failed
                ),
                ui::StyleType::Error,
            ),
            (Some(at), _) => ui::style_text(
                &format!("Rates as of {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                ui::StyleType::Subtle,
            ),
            (None, _) => ui::style_text(
                "Enter an amount to check the rates.",
                ui::StyleType::Subtle,
            ),
        };
        output.push_str("\n\n");
        output.push_str(&footer);
        output
    }
}

/// Fetches one batch for `base` and prints the converted amounts.
pub async fn run(context: &AppContext, amount: Option<String>, base: Option<Currency>) -> Result<()> {
    let converter = &context.converter;
    if let Some(amount) = amount {
        converter.set_amount(amount).await;
    }
    if let Some(base) = base {
        converter.set_base(base).await;
    }
    // The explicit refresh below replaces the debounced one.
    converter.shutdown();

    let pb = ui::new_spinner(&format!("Fetching {} rates...", converter.base()));
    converter.refresh().await;
    pb.finish_and_clear();

    let snapshot = converter.subscribe().borrow().clone();
    println!("{}", snapshot.display_as_table());
    Ok(())
}
