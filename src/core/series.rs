use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::schedule::{allowance_for, tax_year_label};
use super::types::TaxYearRecord;
use crate::error::{LedgerError, LedgerResult};

const MIN_YEAR: i32 = 1000;

/// Largest single-year total accepted. Anything above is treated as invalid,
/// which keeps ledger sums finite.
pub const MAX_AMOUNT: f64 = 1e12;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SeriesWarning {
    UnparsableYear { key: String },
    #[serde(rename_all = "camelCase")]
    ClampedAmount { label: String, raw: String },
    DuplicateYear { label: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub records: Vec<TaxYearRecord>,
    pub warnings: Vec<SeriesWarning>,
}

/// Raw contribution amount as supplied upstream, before clamping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    Missing,
    Other(String),
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

impl From<&Value> for RawAmount {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawAmount::Missing,
            Value::Number(n) => n
                .as_f64()
                .map(RawAmount::Number)
                .unwrap_or_else(|| RawAmount::Other(n.to_string())),
            Value::String(s) => RawAmount::Text(s.clone()),
            other => RawAmount::Other(other.to_string()),
        }
    }
}

/// Extracts the leading four-digit year from keys such as "2023" or
/// "2023/24". Returns `None` when the key does not start with exactly four
/// digits or the year is below 1000.
pub fn parse_year_key(key: &str) -> Option<i32> {
    let key = key.trim();
    let bytes = key.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.get(4).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let year: i32 = key[..4].parse().ok()?;
    (year >= MIN_YEAR).then_some(year)
}

/// Returns the clamped amount and whether clamping discarded a supplied value.
fn coerce_amount(raw: &RawAmount) -> (f64, bool) {
    let parsed = match raw {
        RawAmount::Missing => return (0.0, false),
        RawAmount::Number(v) => Some(*v),
        RawAmount::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        RawAmount::Other(_) => None,
    };
    match parsed {
        // `+ 0.0` turns a parsed "-0" into +0.0.
        Some(v) if v.is_finite() && (0.0..=MAX_AMOUNT).contains(&v) => (v + 0.0, false),
        _ => (0.0, true),
    }
}

fn describe(raw: &RawAmount) -> String {
    match raw {
        RawAmount::Number(v) => v.to_string(),
        RawAmount::Text(s) | RawAmount::Other(s) => s.clone(),
        RawAmount::Missing => "null".to_string(),
    }
}

pub fn normalize_with_warnings<I, K, A>(raw_totals: I) -> NormalizedSeries
where
    I: IntoIterator<Item = (K, A)>,
    K: AsRef<str>,
    A: Into<RawAmount>,
{
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    let mut warnings = Vec::new();

    for (key, amount) in raw_totals {
        let key = key.as_ref();
        let Some(year_start) = parse_year_key(key) else {
            warn!(key, "dropping contribution with unparsable tax year");
            warnings.push(SeriesWarning::UnparsableYear {
                key: key.to_string(),
            });
            continue;
        };

        let label = tax_year_label(year_start);
        let raw = amount.into();
        let (used, clamped) = coerce_amount(&raw);
        if clamped {
            let raw = describe(&raw);
            warn!(%label, %raw, "clamping invalid contribution to zero");
            warnings.push(SeriesWarning::ClampedAmount {
                label: label.clone(),
                raw,
            });
        }

        if by_year.insert(year_start, used).is_some() {
            warn!(%label, "duplicate tax year, keeping the later entry");
            warnings.push(SeriesWarning::DuplicateYear { label });
        }
    }

    let records = by_year
        .into_iter()
        .map(|(year_start, used)| TaxYearRecord {
            year_start,
            label: tax_year_label(year_start),
            allowance: allowance_for(year_start),
            used,
        })
        .collect();

    NormalizedSeries { records, warnings }
}

pub fn normalize<I, K, A>(raw_totals: I) -> Vec<TaxYearRecord>
where
    I: IntoIterator<Item = (K, A)>,
    K: AsRef<str>,
    A: Into<RawAmount>,
{
    normalize_with_warnings(raw_totals).records
}

/// Normalizes a JSON object of year -> amount. `null` is treated as an empty
/// mapping; any other non-object value is rejected.
pub fn normalize_json(value: &Value) -> LedgerResult<NormalizedSeries> {
    match value {
        Value::Null => Ok(NormalizedSeries::default()),
        Value::Object(map) => Ok(normalize_with_warnings(
            map.iter().map(|(key, amount)| (key, RawAmount::from(amount))),
        )),
        other => Err(LedgerError::InvalidInput(format!(
            "expected an object of tax year to amount, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
