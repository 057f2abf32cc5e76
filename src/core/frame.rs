//! Date-indexed tables of prices and returns

use crate::core::frequency::Frequency;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// A single named column of dated observations. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl Series {
    pub fn new(name: &str, points: Vec<(NaiveDate, Option<f64>)>) -> Self {
        Series {
            name: name.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A two dimensional table with dates as rows and named columns.
///
/// Rows are kept in `index` order; each row holds one value per column. The
/// same type backs both price tables and return tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    index: Vec<NaiveDate>,
    rows: Vec<Vec<Option<f64>>>,
}

pub type PriceTable = Frame;
pub type ReturnTable = Frame;

impl Frame {
    pub fn new(
        columns: Vec<String>,
        index: Vec<NaiveDate>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if index.len() != rows.len() {
            bail!(
                "Index has {} dates but table has {} rows",
                index.len(),
                rows.len()
            );
        }
        if let Some((date, row)) = index
            .iter()
            .zip(&rows)
            .find(|(_, row)| row.len() != columns.len())
        {
            bail!(
                "Row for {} has {} values, expected {}",
                date,
                row.len(),
                columns.len()
            );
        }
        Ok(Frame {
            columns,
            index,
            rows,
        })
    }

    /// Creates a table with the given columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Frame {
            columns,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Aligns several series into one table, in the given column order.
    ///
    /// The index is the union of all dates in ascending order. A column has
    /// `None` on dates its series does not cover. When a series repeats a
    /// date, its later point wins.
    pub fn from_series(series: Vec<Series>) -> Self {
        let columns: Vec<String> = series.iter().map(|s| s.name.clone()).collect();
        let mut aligned: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

        for (col, s) in series.into_iter().enumerate() {
            for (date, value) in s.points {
                let row = aligned
                    .entry(date)
                    .or_insert_with(|| vec![None; columns.len()]);
                row[col] = value;
            }
        }

        let (index, rows) = aligned.into_iter().unzip();
        Frame {
            columns,
            index,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Returns the values of one column, in index order.
    pub fn column(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let col = self.position(column)?;
        Some(self.rows.iter().map(|row| row[col]).collect())
    }

    /// Returns the value at `date` for `column`, if both exist and the value is present.
    pub fn get(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let col = self.position(column)?;
        let row = self.index.iter().position(|d| *d == date)?;
        self.rows[row][col]
    }

    /// Selects one column as a series.
    pub fn series(&self, column: &str) -> Result<Series> {
        let values = self.column(column).ok_or_else(|| {
            anyhow!(
                "Column '{}' not found. Available columns: {}",
                column,
                self.columns.join(", ")
            )
        })?;
        Ok(Series::new(
            column,
            self.index.iter().copied().zip(values).collect(),
        ))
    }

    /// Sorts rows by date, ascending. Rows sharing a date keep their order.
    pub fn sort_index(mut self) -> Self {
        let mut pairs: Vec<_> = self.index.into_iter().zip(self.rows).collect();
        pairs.sort_by_key(|(date, _)| *date);
        let (index, rows): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        self.index = index;
        self.rows = rows;
        self
    }

    /// Keeps the rows whose date lies within the inclusive `[start, end]` bound.
    /// A missing bound leaves that side open.
    pub fn truncate(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let keep = |date: &NaiveDate| {
            start.is_none_or(|s| *date >= s) && end.is_none_or(|e| *date <= e)
        };
        let pairs: Vec<_> = self
            .index
            .into_iter()
            .zip(self.rows)
            .filter(|(date, _)| keep(date))
            .collect();
        let (index, rows): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        self.index = index;
        self.rows = rows;
        self
    }

    /// Resamples the index onto `freq`, keeping the last observation per bucket.
    ///
    /// Rows must already be sorted by date. For each column the value of a
    /// bucket is the last non-missing observation that falls in it. Every
    /// bucket from the first to the last observed one is present in the
    /// output, so gaps show up as rows of `None`.
    pub fn resample_last(&self, freq: Frequency) -> Result<Self> {
        let (first, last) = match (self.index.first(), self.index.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(Frame::empty(self.columns.clone())),
        };

        let bucket_of = |date: NaiveDate| {
            freq.bucket(date)
                .ok_or_else(|| anyhow!("Date {} is out of range for frequency {}", date, freq))
        };

        let mut buckets: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        let mut label = bucket_of(first)?;
        let end = bucket_of(last)?;
        while label <= end {
            buckets.insert(label, vec![None; self.columns.len()]);
            label = match freq.next_label(label) {
                Some(next) => next,
                None => break,
            };
        }

        for (date, row) in self.index.iter().zip(&self.rows) {
            let slot = buckets
                .get_mut(&bucket_of(*date)?)
                .ok_or_else(|| anyhow!("Rows are not sorted by date at {}", date))?;
            for (cell, value) in slot.iter_mut().zip(row) {
                if value.is_some() {
                    *cell = *value;
                }
            }
        }

        debug!(
            rows = self.len(),
            buckets = buckets.len(),
            %freq,
            "Resampled table"
        );

        let (index, rows) = buckets.into_iter().unzip();
        Ok(Frame {
            columns: self.columns.clone(),
            index,
            rows,
        })
    }

    /// Simple percentage change between consecutive rows.
    ///
    /// Missing prices are padded with the last observed price of their column
    /// before dividing, so a gap yields `0.0` and the next observation carries
    /// the full move since the last known price. A change is `None` until the
    /// column has a prior observation, and when that prior price is zero.
    pub fn pct_change(&self) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len());
        let mut last: Vec<Option<f64>> = vec![None; self.columns.len()];
        for row in &self.rows {
            let changes = row
                .iter()
                .zip(last.iter_mut())
                .map(|(now, last)| {
                    let before = *last;
                    let now = now.or(before);
                    *last = now;
                    match (before, now) {
                        (Some(before), Some(now)) if before != 0.0 => {
                            Some((now - before) / before)
                        }
                        _ => None,
                    }
                })
                .collect();
            rows.push(changes);
        }
        Frame {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows,
        }
    }

    /// Drops the first `n` rows.
    pub fn skip_rows(mut self, n: usize) -> Self {
        let n = n.min(self.index.len());
        self.index.drain(..n);
        self.rows.drain(..n);
        self
    }

    /// Period-over-period returns: percentage change with the undefined first row removed.
    pub fn returns(&self) -> Self {
        self.pct_change().skip_rows(1)
    }
}
