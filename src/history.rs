//! history.rs — the persisted table of observations for one report.

use chrono::{NaiveDate, TimeDelta};

use crate::store::{Observation, Schema};

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    schema: Schema,
    rows: Vec<Observation>,
}

impl History {
    pub fn new(schema: Schema, rows: Vec<Observation>) -> Self {
        Self { schema, rows }
    }

    pub fn empty(schema: Schema) -> Self {
        Self::new(schema, Vec::new())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching `keep`, original order.
    pub fn filter(&self, keep: impl Fn(&Observation) -> bool) -> History {
        History::new(
            self.schema.clone(),
            self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        )
    }

    /// Stable sort by a date column; rows without a date go last.
    pub fn sorted_by_date(&self, date_column: &str) -> History {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| r.date(date_column).map_or((1, NaiveDate::MIN), |d| (0, d)));
        History::new(self.schema.clone(), rows)
    }

    /// Rows dated on or after `cutoff`.
    pub fn since(&self, date_column: &str, cutoff: NaiveDate) -> History {
        self.filter(|r| r.date(date_column).is_some_and(|d| d >= cutoff))
    }

    /// Rows from the last `days` days ending `today`. A window reaching past the
    /// calendar keeps every dated row.
    pub fn last_days(&self, date_column: &str, today: NaiveDate, days: i64) -> History {
        match TimeDelta::try_days(days).and_then(|span| today.checked_sub_signed(span)) {
            Some(cutoff) => self.since(date_column, cutoff),
            None => self.filter(|r| r.date(date_column).is_some()),
        }
    }

    /// `(date, value)` pairs for charting, skipping rows missing either.
    pub fn series(&self, date_column: &str, value_column: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|r| Some((r.date(date_column)?, r.f64(value_column)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> History {
        let schema = Schema::new([("date", ColumnType::Date), ("rate", ColumnType::Float)]);
        let rows = vec![
            Observation::new().with("date", d(2024, 3, 5)).with("rate", 83.0),
            Observation::new().with("date", d(2024, 1, 2)).with("rate", 82.0),
            Observation::new().with("date", d(2024, 2, 9)).with("rate", 82.5),
        ];
        History::new(schema, rows)
    }

    #[test]
    fn sort_and_window() {
        let h = sample().sorted_by_date("date");
        let dates: Vec<_> = h.rows().iter().filter_map(|r| r.date("date")).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 2, 9), d(2024, 3, 5)]);

        let recent = h.since("date", d(2024, 2, 9));
        assert_eq!(recent.series("date", "rate"), vec![(d(2024, 2, 9), 82.5), (d(2024, 3, 5), 83.0)]);
    }

    #[test]
    fn last_days_counts_back_from_today() {
        let h = sample();
        assert_eq!(h.last_days("date", d(2024, 3, 10), 30).len(), 2);
        assert_eq!(h.last_days("date", d(2024, 3, 10), 5).len(), 1);
    }

    #[test]
    fn oversized_window_keeps_everything() {
        let h = sample();
        assert_eq!(h.last_days("date", d(2024, 3, 10), i64::MAX).len(), 3);
        assert_eq!(h.last_days("date", d(2024, 3, 10), 200_000_000).len(), 3);
    }
}
