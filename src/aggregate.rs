//! Monthly aggregation over a district's raw records.
//!
//! Records are bucketed by a normalized month token, the numeric fields of
//! interest are averaged per month, and the rows come back in calendar
//! order. The headline row is the latest calendar month present in the data,
//! which is not necessarily the most recently fetched record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Record;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Upstream field names per averaged metric, in probe order. The spellings
/// drift between fiscal years, hence the aliases.
const HOUSEHOLDS_FIELDS: [&str; 2] = ["Total_Households_Worked", "Total Households Worked"];
const INDIVIDUALS_FIELDS: [&str; 2] = ["Total_Individuals_Worked", "Total Individuals Worked"];
const PERSONDAYS_FIELDS: [&str; 1] = ["Persondays_of_Central_Liability_so_far"];
const WAGES_FIELDS: [&str; 1] = ["Wages"];
const AVG_DAYS_FIELDS: [&str; 1] = ["Average_days_of_employment_provided_per_Household"];

/// Averaged metrics for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRow {
    /// Three-letter month label, e.g. "Jan".
    pub month: String,
    /// Calendar index, Jan = 1 .. Dec = 12.
    pub month_index: u32,
    /// Number of records averaged into this row.
    pub records: usize,
    pub households_worked: f64,
    pub individuals_worked: f64,
    pub persondays: f64,
    pub wages: f64,
    pub avg_days_per_household: f64,
}

/// Calendar-ordered monthly rows for one district.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonthlySummary {
    pub rows: Vec<MonthlyRow>,
}

impl MonthlySummary {
    /// The latest calendar month with data.
    pub fn headline(&self) -> Option<&MonthlyRow> {
        self.rows.last()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalize a free-text month to its calendar index and canonical label.
///
/// Mirrors the upstream convention: the first three characters, title-cased,
/// decide the month ("January", "JAN" and "jan" all map to Jan).
fn normalize_month(raw: &str) -> Option<(u32, &'static str)> {
    let mut chars = raw.trim().chars();
    let first = chars.next()?.to_uppercase().next()?;
    let rest: String = chars.take(2).flat_map(char::to_lowercase).collect();
    let token = format!("{first}{rest}");
    MONTHS
        .iter()
        .position(|m| *m == token)
        .map(|i| (i as u32 + 1, MONTHS[i]))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(records: &[&Record], fields: &[&str]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| r.numeric(fields)).sum();
    round2(sum / records.len() as f64)
}

/// Compute per-month averages for a district's records.
///
/// Records without a parseable month are skipped; empty input yields an
/// empty summary. Input order never affects the output.
pub fn summarize(records: &[Record]) -> MonthlySummary {
    let mut buckets: BTreeMap<u32, (&'static str, Vec<&Record>)> = BTreeMap::new();
    for record in records {
        let Some((index, label)) = record.month().and_then(normalize_month) else {
            continue;
        };
        buckets
            .entry(index)
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push(record);
    }

    let rows = buckets
        .into_iter()
        .map(|(index, (label, group))| MonthlyRow {
            month: label.to_string(),
            month_index: index,
            records: group.len(),
            households_worked: mean(&group, &HOUSEHOLDS_FIELDS),
            individuals_worked: mean(&group, &INDIVIDUALS_FIELDS),
            persondays: mean(&group, &PERSONDAYS_FIELDS),
            wages: mean(&group, &WAGES_FIELDS),
            avg_days_per_household: mean(&group, &AVG_DAYS_FIELDS),
        })
        .collect();

    MonthlySummary { rows }
}
