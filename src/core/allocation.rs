//! Groups derived holdings by sector and sums portfolio totals.
use crate::core::holding::{HoldingWithLive, PortfolioTotals, SectorGroupTotals};
use std::collections::HashMap;

/// Sums investment, present value and gain/loss per sector.
///
/// Sectors are matched by exact string and listed in order of first appearance.
pub fn sector_totals(holdings: &[HoldingWithLive]) -> Vec<SectorGroupTotals> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sectors: Vec<SectorGroupTotals> = Vec::new();

    for holding in holdings {
        let slot = *index.entry(holding.sector()).or_insert_with(|| {
            sectors.push(SectorGroupTotals {
                sector: holding.sector().to_string(),
                total_investment: 0.0,
                total_present_value: 0.0,
                total_gain_loss: 0.0,
            });
            sectors.len() - 1
        });

        let entry = &mut sectors[slot];
        entry.total_investment += holding.investment();
        entry.total_present_value += holding.present_value();
        entry.total_gain_loss += holding.gain_loss();
    }

    sectors
}

pub fn grand_totals(holdings: &[HoldingWithLive]) -> PortfolioTotals {
    holdings
        .iter()
        .fold(PortfolioTotals::default(), |mut totals, holding| {
            totals.total_investment += holding.investment();
            totals.total_present_value += holding.present_value();
            totals.total_gain_loss += holding.gain_loss();
            totals
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::holding::{Exchange, HoldingBase, LiveMetrics};

    fn derived(sector: &str, price: f64, quantity: f64, cmp: Option<f64>) -> HoldingWithLive {
        HoldingWithLive::derive(
            HoldingBase {
                name: format!("{sector}-{price}"),
                ticker: "X.NS".to_string(),
                exchange: Exchange::Nse,
                sector: sector.to_string(),
                purchase_price: price,
                quantity,
            },
            LiveMetrics {
                cmp,
                ..LiveMetrics::default()
            },
            0.0,
        )
    }

    fn sample() -> Vec<HoldingWithLive> {
        vec![
            derived("Financials", 100.0, 10.0, Some(110.0)),
            derived("Tech", 50.0, 4.0, Some(40.0)),
            derived("Financials", 20.0, 5.0, None),
            derived("tech", 10.0, 1.0, Some(12.0)),
        ]
    }

    #[test]
    fn test_sector_totals_group_by_exact_name() {
        let sectors = sector_totals(&sample());
        let names: Vec<_> = sectors.iter().map(|s| s.sector.as_str()).collect();
        assert_eq!(names, vec!["Financials", "Tech", "tech"]);

        let financials = &sectors[0];
        assert_eq!(financials.total_investment, 1100.0);
        assert_eq!(financials.total_present_value, 1100.0);
        assert_eq!(financials.total_gain_loss, 0.0);
    }

    #[test]
    fn test_sector_sums_match_grand_totals() {
        let holdings = sample();
        let sectors = sector_totals(&holdings);
        let totals = grand_totals(&holdings);

        let invested: f64 = sectors.iter().map(|s| s.total_investment).sum();
        let present: f64 = sectors.iter().map(|s| s.total_present_value).sum();
        let gain: f64 = sectors.iter().map(|s| s.total_gain_loss).sum();
        assert!((invested - totals.total_investment).abs() < 1e-9);
        assert!((present - totals.total_present_value).abs() < 1e-9);
        assert!((gain - totals.total_gain_loss).abs() < 1e-9);
    }

    #[test]
    fn test_totals_do_not_depend_on_order() {
        let holdings = sample();
        let mut reversed = holdings.clone();
        reversed.reverse();
        assert_eq!(grand_totals(&holdings), grand_totals(&reversed));
    }

    #[test]
    fn test_empty_portfolio() {
        assert!(sector_totals(&[]).is_empty());
        assert_eq!(grand_totals(&[]), PortfolioTotals::default());
    }
}
