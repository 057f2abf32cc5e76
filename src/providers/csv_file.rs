use crate::core::frame::Series;
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Header of the column used as the table index.
pub const DATE_COLUMN: &str = "Date";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_value(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let value: f64 = text
        .parse()
        .map_err(|e| anyhow!("Invalid number '{}': {}", text, e))?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

/// A delimited price file indexed by its `Date` column.
///
/// Dates are parsed when the file is opened. Other cells are kept as text and
/// parsed only when their column is selected, so columns nobody asks for may
/// hold anything.
#[derive(Debug)]
pub struct PriceFile {
    path: PathBuf,
    headers: StringRecord,
    date_col: usize,
    records: Vec<(NaiveDate, StringRecord)>,
}

impl PriceFile {
    /// Opens `path` and reads its rows, sorted by date with file order kept for equal dates.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open price file: {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of price file: {}", path.display()))?
            .clone();
        let date_col = headers
            .iter()
            .position(|h| h.trim() == DATE_COLUMN)
            .ok_or_else(|| {
                anyhow!(
                    "Column '{}' not found in price file: {}",
                    DATE_COLUMN,
                    path.display()
                )
            })?;

        let mut records = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to read row {} of {}", line + 1, path.display())
            })?;
            let date_text = record.get(date_col).unwrap_or_default();
            let date = parse_date(date_text).ok_or_else(|| {
                anyhow!(
                    "Unparsable date '{}' in row {} of {}",
                    date_text,
                    line + 1,
                    path.display()
                )
            })?;
            records.push((date, record));
        }
        records.sort_by_key(|(date, _)| *date);

        debug!(
            rows = records.len(),
            columns = headers.len() - 1,
            "Loaded price file"
        );
        Ok(PriceFile {
            path: path.to_path_buf(),
            headers,
            date_col,
            records,
        })
    }

    /// Names of the value columns, in file order.
    pub fn columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.date_col)
            .map(|(_, h)| h.trim())
            .collect()
    }

    /// Parses the column named `ticker` into a series.
    ///
    /// Empty and `NaN` cells are missing values.
    pub fn series(&self, ticker: &str) -> Result<Series> {
        let col = self
            .headers
            .iter()
            .enumerate()
            .position(|(i, h)| i != self.date_col && h.trim() == ticker)
            .ok_or_else(|| {
                anyhow!(
                    "Column '{}' not found. Available columns: {}",
                    ticker,
                    self.columns().join(", ")
                )
            })
            .with_context(|| format!("Ticker {} not found in {}", ticker, self.path.display()))?;

        let points = self
            .records
            .iter()
            .map(|(date, record)| {
                let value = parse_value(record.get(col).unwrap_or_default()).with_context(|| {
                    format!(
                        "Bad value for {} on {} in {}",
                        ticker,
                        date,
                        self.path.display()
                    )
                })?;
                Ok((*date, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Series::new(ticker, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_file(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("prices.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_open_sorts_by_date() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            "Date,AAPL,MSFT\n\
             2020-01-08,303.19,163.05\n\
             2020-01-06,299.80,159.03\n\
             2020-01-07,298.39,157.58\n",
        );

        let file = PriceFile::open(&path)?;
        assert_eq!(file.columns(), vec!["AAPL", "MSFT"]);
        let series = file.series("MSFT")?;
        assert_eq!(
            series.points,
            vec![
                (date(2020, 1, 6), Some(159.03)),
                (date(2020, 1, 7), Some(157.58)),
                (date(2020, 1, 8), Some(163.05)),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_series_selects_ticker() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            "AAPL,Date,MSFT\n\
             1.5,01/07/2020,\n\
             1.0,01/06/2020,NaN\n",
        );
        let file = PriceFile::open(&path)?;

        let series = file.series("MSFT")?;
        assert_eq!(series.name, "MSFT");
        assert_eq!(
            series.points,
            vec![(date(2020, 1, 6), None), (date(2020, 1, 7), None)]
        );

        let series = file.series("AAPL")?;
        assert_eq!(
            series.points,
            vec![(date(2020, 1, 6), Some(1.0)), (date(2020, 1, 7), Some(1.5))]
        );
        Ok(())
    }

    #[test]
    fn test_text_columns_are_ignored_unless_selected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(
            &dir,
            "Date,AAPL,Exchange\n\
             2020-01-06,299.80,NASDAQ\n\
             2020-01-07,298.39,NASDAQ\n",
        );
        let file = PriceFile::open(&path)?;

        let series = file.series("AAPL")?;
        assert_eq!(
            series.points,
            vec![
                (date(2020, 1, 6), Some(299.80)),
                (date(2020, 1, 7), Some(298.39)),
            ]
        );

        let err = file.series("Exchange").unwrap_err();
        assert!(err.to_string().contains("Bad value for Exchange on 2020-01-06"));
        assert!(format!("{err:#}").contains("Invalid number 'NASDAQ'"));
        Ok(())
    }

    #[test]
    fn test_missing_ticker_column() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "Date,AAPL\n2020-01-06,1.0\n");

        let err = PriceFile::open(&path)?.series("GOOG").unwrap_err();
        assert!(err.to_string().contains("Ticker GOOG not found"));
        assert!(format!("{err:#}").contains("Column 'GOOG' not found. Available columns: AAPL"));

        let err = PriceFile::open(&path)?.series("Date").unwrap_err();
        assert!(err.to_string().contains("Ticker Date not found"));
        Ok(())
    }

    #[test]
    fn test_missing_date_column() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "Day,AAPL\n2020-01-06,1.0\n");

        let err = PriceFile::open(&path).unwrap_err();
        assert!(err.to_string().contains("Column 'Date' not found"));
        Ok(())
    }

    #[test]
    fn test_unparsable_date() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "Date,AAPL\nyesterday,1.0\n");

        let err = PriceFile::open(&path).unwrap_err();
        assert!(err.to_string().contains("Unparsable date 'yesterday' in row 1"));
        Ok(())
    }

    #[test]
    fn test_invalid_number() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_file(&dir, "Date,AAPL\n2020-01-06,abc\n");

        let err = PriceFile::open(&path)?.series("AAPL").unwrap_err();
        assert!(format!("{err:#}").contains("Invalid number 'abc'"));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = PriceFile::open("/nonexistent/prices.csv").unwrap_err();
        assert!(
            err.to_string()
                .contains("Failed to open price file: /nonexistent/prices.csv")
        );
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-01-06"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("2020/01/06"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("01/06/2020"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("06-Jan-2020"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("20200106"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("2020-01-06 16:00:00"), Some(date(2020, 1, 6)));
        assert_eq!(parse_date("not a date"), None);
    }
}
