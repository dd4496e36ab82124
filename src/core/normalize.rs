//! Turns loosely typed holdings rows into [`HoldingBase`] records.
//!
//! Two row shapes are accepted:
//!
//! * clean objects with `name`, `sector`, `purchasePrice`, `quantity` and an optional
//!   `ticker` or `symbol`;
//! * rows exported from the legacy spreadsheet, keyed `Column2` (name, or a sector
//!   heading), `Column3` (purchase price), `Column4` (quantity) and `Column7` (symbol).
//!
//! Rows that fit neither shape are dropped without error.

use crate::core::holding::HoldingBase;
use crate::core::ticker::derive_ticker;
use serde_json::{Map, Value};
use tracing::debug;

const DEFAULT_SECTOR: &str = "Unknown";

const LEGACY_NAME: &str = "Column2";
const LEGACY_PRICE: &str = "Column3";
const LEGACY_QUANTITY: &str = "Column4";
const LEGACY_SYMBOL: &str = "Column7";

pub fn normalize_rows(rows: &[Value]) -> Vec<HoldingBase> {
    let mut holdings = Vec::new();
    let mut current_sector = DEFAULT_SECTOR.to_string();

    for row in rows {
        let Some(row) = row.as_object() else {
            continue;
        };

        if let Some(holding) = parse_clean_row(row) {
            holdings.push(holding);
            continue;
        }

        let name = row.get(LEGACY_NAME).and_then(Value::as_str);
        let price = row.get(LEGACY_PRICE).and_then(finite_number);
        let quantity = row.get(LEGACY_QUANTITY).and_then(finite_number);

        match (name, price, quantity) {
            (Some(name), Some(purchase_price), Some(quantity)) => {
                let derived = derive_ticker(row.get(LEGACY_SYMBOL).unwrap_or(&Value::Null));
                holdings.push(HoldingBase {
                    name: name.trim().to_string(),
                    ticker: derived.ticker,
                    exchange: derived.exchange,
                    sector: current_sector.clone(),
                    purchase_price,
                    quantity,
                });
            }
            // A name with neither number is a sector heading for the rows below it.
            (Some(heading), None, None) => {
                let heading = heading.trim();
                if !heading.is_empty() {
                    debug!(sector = heading, "Entering sector");
                    current_sector = heading.to_string();
                }
            }
            _ => {}
        }
    }

    debug!(rows = rows.len(), holdings = holdings.len(), "Normalized rows");
    holdings
}

fn parse_clean_row(row: &Map<String, Value>) -> Option<HoldingBase> {
    if !["name", "purchasePrice", "quantity", "sector"]
        .iter()
        .all(|key| row.contains_key(*key))
    {
        return None;
    }

    let name = coerce_string(row.get("name")).trim().to_string();
    let sector = match row.get("sector") {
        None | Some(Value::Null) => DEFAULT_SECTOR.to_string(),
        Some(value) => coerce_string(Some(value)).trim().to_string(),
    };
    let purchase_price = row.get("purchasePrice").and_then(coerce_number)?;
    let quantity = row.get("quantity").and_then(coerce_number)?;
    if name.is_empty() {
        return None;
    }

    let raw_symbol = row
        .get("ticker")
        .filter(|v| !v.is_null())
        .or_else(|| row.get("symbol"))
        .unwrap_or(&Value::Null);
    let derived = derive_ticker(raw_symbol);

    Some(HoldingBase {
        name,
        ticker: derived.ticker,
        exchange: derived.exchange,
        sector,
        purchase_price,
        quantity,
    })
}

/// A JSON number. Strings do not count, which is what tells legacy headings apart.
fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// A number, or a string holding one.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => finite_number(value),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
