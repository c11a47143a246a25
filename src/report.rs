//! Summary statistics over stored greenhouse rows.

use crate::reading::GreenhouseRow;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub first: GreenhouseRow,
    pub last: GreenhouseRow,
    /// Dates with at least one outside reading at or below the threshold, ascending
    pub cold_nights: Vec<NaiveDate>,
    pub lowest_in: GreenhouseRow,
    pub highest_in: GreenhouseRow,
    pub average_in: f64,
    pub lowest_out: GreenhouseRow,
    pub highest_out: GreenhouseRow,
    pub average_out: f64,
    pub average_difference: f64,
    pub biggest_difference: GreenhouseRow,
}

/// Summarize `rows`. Returns `None` for an empty set.
///
/// Rows are ordered by `time` first, so ties on any extreme go to the earliest record.
pub fn summarize(rows: &[GreenhouseRow], cold_threshold: f64) -> Option<Summary> {
    let mut sorted: Vec<&GreenhouseRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.time);
    let first = *sorted.first()?;
    let last = *sorted.last()?;

    let cold_nights: BTreeSet<NaiveDate> = sorted
        .iter()
        .filter(|r| r.temperature_out <= cold_threshold)
        .map(|r| r.day)
        .collect();

    let n = sorted.len() as f64;
    let mean = |f: fn(&GreenhouseRow) -> f64| sorted.iter().map(|r| f(r)).sum::<f64>() / n;

    Some(Summary {
        count: sorted.len(),
        first: first.clone(),
        last: last.clone(),
        cold_nights: cold_nights.into_iter().collect(),
        lowest_in: extreme(&sorted, |r| -r.temperature_in),
        highest_in: extreme(&sorted, |r| r.temperature_in),
        average_in: mean(|r| r.temperature_in),
        lowest_out: extreme(&sorted, |r| -r.temperature_out),
        highest_out: extreme(&sorted, |r| r.temperature_out),
        average_out: mean(|r| r.temperature_out),
        average_difference: mean(difference),
        biggest_difference: extreme(&sorted, difference),
    })
}

fn difference(r: &GreenhouseRow) -> f64 {
    r.temperature_in - r.temperature_out
}

/// Row with the largest `key`; the first one wins on ties. `rows` must not be empty.
fn extreme(rows: &[&GreenhouseRow], key: impl Fn(&GreenhouseRow) -> f64) -> GreenhouseRow {
    let mut best = rows[0];
    for &r in &rows[1..] {
        if key(r) > key(best) {
            best = r;
        }
    }
    best.clone()
}

struct RowDisplay<'a>(&'a GreenhouseRow);

impl fmt::Display for RowDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(
            f,
            "{} {} {} in={} out={} check={} humidity={} light={}",
            r.source,
            r.day,
            r.time.to_rfc3339(),
            r.temperature_in,
            r.temperature_out,
            r.temperature_check,
            r.humidity,
            r.light
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total count: {}", self.count)?;
        writeln!(f, "First record: {}", RowDisplay(&self.first))?;
        writeln!(f, "Last record: {}", RowDisplay(&self.last))?;
        writeln!(f, "Cold nights:")?;
        for night in &self.cold_nights {
            writeln!(f, "  {}", night)?;
        }
        writeln!(f, "Lowest in: {}", RowDisplay(&self.lowest_in))?;
        writeln!(f, "Highest in: {}", RowDisplay(&self.highest_in))?;
        writeln!(f, "Average in: {:.2}", self.average_in)?;
        writeln!(f, "Lowest out: {}", RowDisplay(&self.lowest_out))?;
        writeln!(f, "Highest out: {}", RowDisplay(&self.highest_out))?;
        writeln!(f, "Average out: {:.2}", self.average_out)?;
        writeln!(f, "Average difference: {:.2}", self.average_difference)?;
        write!(f, "Biggest difference: {}", RowDisplay(&self.biggest_difference))
    }
}
