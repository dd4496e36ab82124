use super::ui;
use crate::core::holding::{PortfolioResponse, PortfolioTotals};
use crate::core::PortfolioService;
use anyhow::Result;
use comfy_table::Cell;

impl PortfolioResponse {
    /// Renders every holding with its live metrics, grouped in input order.
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Holding"),
            ui::header_cell("Ticker"),
            ui::header_cell("Sector"),
            ui::header_cell("Qty"),
            ui::header_cell("Buy Price"),
            ui::header_cell("CMP"),
            ui::header_cell("P/E (TTM)"),
            ui::header_cell("EPS"),
            ui::header_cell("Investment"),
            ui::header_cell("Present Value"),
            ui::header_cell("Gain/Loss"),
            ui::header_cell("Weight (%)"),
        ]);

        for holding in &self.holdings {
            let base = holding.base();
            let live = holding.live();
            table.add_row(vec![
                Cell::new(&base.name),
                Cell::new(&base.ticker),
                Cell::new(&base.sector),
                ui::number_cell(base.quantity),
                ui::number_cell(base.purchase_price),
                ui::format_optional_cell(live.cmp, |p| format!("{p:.2}")),
                ui::format_optional_cell(live.pe_ttm, |p| format!("{p:.2}")),
                ui::format_optional_cell(live.latest_eps, |e| format!("{e:.2}")),
                ui::number_cell(holding.investment()),
                ui::number_cell(holding.present_value()),
                ui::gain_loss_cell(holding.gain_loss()),
                ui::number_cell(holding.portfolio_percent()),
            ]);
        }

        let mut output = format!(
            "Holdings: {}\n\n",
            ui::style_text(
                &format!("{} positions", self.holdings.len()),
                ui::StyleType::Title
            )
        );
        output.push_str(&table.to_string());
        output
    }

    /// Renders the per-sector totals followed by the grand totals.
    pub fn display_sectors_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Sector"),
            ui::header_cell("Investment"),
            ui::header_cell("Present Value"),
            ui::header_cell("Gain/Loss"),
        ]);

        for sector in &self.sectors {
            table.add_row(vec![
                Cell::new(&sector.sector),
                ui::number_cell(sector.total_investment),
                ui::number_cell(sector.total_present_value),
                ui::gain_loss_cell(sector.total_gain_loss),
            ]);
        }

        let mut output = format!(
            "Sectors: {}\n\n",
            ui::style_text(
                &format!("{} groups", self.sectors.len()),
                ui::StyleType::Title
            )
        );
        output.push_str(&table.to_string());
        output.push_str(&format_totals(&self.totals));
        output
    }
}

fn format_totals(totals: &PortfolioTotals) -> String {
    let gain_style = if totals.total_gain_loss >= 0.0 {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };
    format!(
        "\n\n{}: {:.2}\n{}: {:.2}\n{}: {}",
        ui::style_text("Total Investment", ui::StyleType::TotalLabel),
        totals.total_investment,
        ui::style_text("Present Value", ui::StyleType::TotalLabel),
        totals.total_present_value,
        ui::style_text("Net Gain/Loss", ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:+.2}", totals.total_gain_loss), gain_style)
    )
}

pub async fn run(service: &PortfolioService) -> Result<()> {
    let pb = ui::new_spinner("Fetching live market data...");
    let result = service.snapshot().await;
    pb.finish_and_clear();
    let response = result?;

    println!("{}", response.display_as_table());
    ui::print_separator();
    println!("{}", response.display_sectors_as_table());

    let missing = response
        .holdings
        .iter()
        .filter(|h| h.live().cmp.is_none())
        .count();
    if missing > 0 {
        println!(
            "\n{}",
            ui::style_text(
                &format!("{missing} holding(s) have no live price; present value counts them as 0"),
                ui::StyleType::Subtle
            )
        );
    }
    println!(
        "\n{}",
        ui::style_text(
            &format!("Last updated {}", response.last_updated.to_rfc3339()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
