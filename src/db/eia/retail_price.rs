use log::debug;
use serde_json::Value;

use crate::interval::month::Month;

use super::lib_eia::RawRecord;

/// A cleaned observation, ready to be stored.  `price` is always finite
/// and strictly positive, `month` is formatted as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub month: String,
    pub state: String,
    pub sector: String,
    pub price: f64,
    pub units: String,
}

/// Counts of the records dropped while cleaning.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QualityReport {
    pub input: usize,
    pub missing_price: usize,
    pub missing_month: usize,
    pub missing_both: usize,
    pub non_positive_price: usize,
}

impl QualityReport {
    pub fn dropped(&self) -> usize {
        self.missing_price + self.missing_month - self.missing_both + self.non_positive_price
    }
}

/// Numeric value of a price.  Strings that don't parse as a finite number
/// (e.g. "None", "", "NaN") are treated as missing.
pub fn coerce_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    price.is_finite().then_some(price)
}

pub fn coerce_period(value: &Value) -> Option<Month> {
    match value {
        Value::String(s) => s.parse::<Month>().ok(),
        // annual data may come back as a bare number
        Value::Number(n) => n.to_string().parse::<Month>().ok(),
        _ => None,
    }
}

/// Clean the raw records and report what was dropped.
pub fn clean(records: &[RawRecord]) -> (Vec<Row>, QualityReport) {
    let mut report = QualityReport {
        input: records.len(),
        ..QualityReport::default()
    };
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let price = record.price.as_ref().and_then(coerce_price);
        let month = record.period.as_ref().and_then(coerce_period);
        let (price, month) = match (price, month) {
            (Some(price), Some(month)) => (price, month),
            (None, None) => {
                report.missing_price += 1;
                report.missing_month += 1;
                report.missing_both += 1;
                continue;
            }
            (None, Some(_)) => {
                report.missing_price += 1;
                continue;
            }
            (Some(_), None) => {
                report.missing_month += 1;
                continue;
            }
        };
        if price <= 0.0 {
            report.non_positive_price += 1;
            continue;
        }
        rows.push(Row {
            month: month.to_string(),
            state: record.stateid.clone().unwrap_or_default(),
            sector: record.sector_name.clone().unwrap_or_default(),
            price,
            units: record.price_units.clone().unwrap_or_default(),
        });
    }
    (rows, report)
}

/// Turn raw API records into rows.  Records with a missing price or
/// period, or a price <= 0, are dropped.  Order of the input is kept.
pub fn transform(records: &[RawRecord]) -> Vec<Row> {
    if records.is_empty() {
        return Vec::new();
    }
    let (rows, report) = clean(records);
    if report.dropped() > 0 {
        debug!(
            "Dropped {} of {} records: missing price {}, missing month {}, missing both {}, price <= 0 {}",
            report.dropped(),
            report.input,
            report.missing_price,
            report.missing_month,
            report.missing_both,
            report.non_positive_price
        );
    }
    rows
}

/// Keep only the rows strictly after the `watermark` month.  Months are
/// compared as `YYYY-MM` strings.
pub fn newer_than(rows: Vec<Row>, watermark: Option<&str>) -> Vec<Row> {
    match watermark {
        Some(watermark) => rows
            .into_iter()
            .filter(|row| row.month.as_str() > watermark)
            .collect(),
        None => rows,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::error::Error;

    use super::*;

    fn raw(period: Value, price: Value) -> RawRecord {
        serde_json::from_value(json!({
            "period": period,
            "stateid": "NY",
            "sectorName": "residential",
            "price": price,
            "price-units": "cents/kWh",
        }))
        .unwrap()
    }

    fn row(month: &str, price: f64) -> Row {
        Row {
            month: month.to_string(),
            state: "NY".to_string(),
            sector: "residential".to_string(),
            price,
            units: "cents/kWh".to_string(),
        }
    }

    #[test]
    fn drop_missing_price() -> Result<(), Box<dyn Error>> {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
        let records: Vec<RawRecord> = serde_json::from_value(json!([
            {"period": "2025-02", "stateid": "NY", "sectorName": "residential",
             "price": "18.5", "price-units": "cents/kWh"},
            {"period": "2025-02", "stateid": "NY", "sectorName": "other",
             "price": "None", "price-units": "cents/kWh"},
        ]))?;
        let rows = transform(&records);
        assert_eq!(rows, vec![row("2025-02", 18.5)]);
        Ok(())
    }

    #[test]
    fn empty_input() {
        assert!(transform(&[]).is_empty());
        let (rows, report) = clean(&[]);
        assert!(rows.is_empty());
        assert_eq!(report, QualityReport::default());
    }

    #[test]
    fn drop_non_positive_prices() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
        let records = vec![
            raw(json!("2025-01"), json!("-5.0")),
            raw(json!("2025-01"), json!("0")),
            raw(json!("2025-01"), json!(0.01)),
        ];
        let rows = transform(&records);
        assert_eq!(rows, vec![row("2025-01", 0.01)]);
    }

    #[test]
    fn drop_bad_periods_and_prices() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
        let records = vec![
            raw(json!("not a date"), json!("12.0")),
            raw(json!(null), json!("12.0")),
            raw(json!("2024-13"), json!(null)),
            raw(json!("2024-12"), json!("NaN")),
            raw(json!("2024-12"), json!("")),
            raw(json!("2024-12"), json!(true)),
            raw(json!("2024-12-01"), json!(" 11.25 ")),
        ];
        let (rows, report) = clean(&records);
        assert_eq!(rows, vec![row("2024-12", 11.25)]);
        assert_eq!(report.missing_month, 3);
        assert_eq!(report.missing_price, 4);
        assert_eq!(report.missing_both, 1);
        assert_eq!(report.dropped(), 6);
        for row in &rows {
            assert!(row.price > 0.0);
            assert!(row.month.parse::<Month>().is_ok());
            assert_eq!(row.month.len(), 7);
        }
    }

    #[test]
    fn missing_text_fields_are_empty() -> Result<(), Box<dyn Error>> {
        let records: Vec<RawRecord> =
            serde_json::from_value(json!([{"period": "2023-06", "price": 9.1}]))?;
        let rows = transform(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, "");
        assert_eq!(rows[0].sector, "");
        assert_eq!(rows[0].units, "");
        Ok(())
    }

    #[test]
    fn transform_is_idempotent() -> Result<(), Box<dyn Error>> {
        let records = vec![
            raw(json!("2025-03"), json!("17.25")),
            raw(json!("2025-02"), json!("None")),
            raw(json!("2025-01"), json!("16")),
        ];
        let rows = transform(&records);
        assert_eq!(rows.len(), 2);

        // serialize the cleaned rows back into the API shape
        let again: Vec<RawRecord> = rows
            .iter()
            .map(|r| {
                serde_json::from_value(json!({
                    "period": r.month,
                    "stateid": r.state,
                    "sectorName": r.sector,
                    "price": r.price,
                    "price-units": r.units,
                }))
            })
            .collect::<Result<_, _>>()?;
        assert_eq!(transform(&again), rows);
        Ok(())
    }

    #[test]
    fn filter_by_watermark() {
        let rows = vec![row("2024-12", 1.0), row("2025-01", 2.0), row("2025-02", 3.0)];
        let kept = newer_than(rows.clone(), Some("2025-01"));
        assert_eq!(kept, vec![row("2025-02", 3.0)]);
        assert_eq!(newer_than(rows.clone(), None), rows);
        assert!(newer_than(rows, Some("2025-02")).is_empty());
    }
}
