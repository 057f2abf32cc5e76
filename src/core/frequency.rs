//! Resample frequencies and their bucket calendars

use anyhow::{Result, anyhow};
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Bucketing rule used to collapse observations onto a regular calendar.
///
/// Every date maps to exactly one bucket, identified by its label date. Labels
/// are ordered, and `next_label` walks from one bucket to the following one so
/// that a resampled table can include buckets that received no observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    #[default]
    BusinessDay,
    Day,
    Week(Weekday),
    MonthEnd,
    BusinessMonthEnd,
    QuarterEnd,
    YearEnd,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))
}

fn business_month_end(date: NaiveDate) -> Option<NaiveDate> {
    let mut last = month_end(date)?;
    while is_weekend(last) {
        last = last.pred_opt()?;
    }
    Some(last)
}

fn quarter_end(date: NaiveDate) -> Option<NaiveDate> {
    let quarter_month = (date.month0() / 3) * 3 + 3;
    month_end(NaiveDate::from_ymd_opt(date.year(), quarter_month, 1)?)
}

fn weekday_alias(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

impl Frequency {
    /// Returns the label of the bucket `date` falls into.
    pub fn bucket(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::BusinessDay => match date.weekday() {
                Weekday::Sat => date.checked_sub_days(Days::new(1)),
                Weekday::Sun => date.checked_sub_days(Days::new(2)),
                _ => Some(date),
            },
            Frequency::Day => Some(date),
            Frequency::Week(anchor) => {
                let ahead = (7 + anchor.num_days_from_monday()
                    - date.weekday().num_days_from_monday())
                    % 7;
                date.checked_add_days(Days::new(ahead as u64))
            }
            Frequency::MonthEnd => month_end(date),
            Frequency::BusinessMonthEnd => {
                let last = business_month_end(date)?;
                if date > last {
                    business_month_end(date.with_day(1)?.checked_add_months(Months::new(1))?)
                } else {
                    Some(last)
                }
            }
            Frequency::QuarterEnd => quarter_end(date),
            Frequency::YearEnd => NaiveDate::from_ymd_opt(date.year(), 12, 31),
        }
    }

    /// Returns the label of the bucket following `label`.
    pub fn next_label(&self, label: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::BusinessDay => {
                let mut next = label.succ_opt()?;
                while is_weekend(next) {
                    next = next.succ_opt()?;
                }
                Some(next)
            }
            Frequency::Day => label.succ_opt(),
            Frequency::Week(_) => label.checked_add_days(Days::new(7)),
            Frequency::MonthEnd => month_end(label.with_day(1)?.checked_add_months(Months::new(1))?),
            Frequency::BusinessMonthEnd => {
                business_month_end(label.with_day(1)?.checked_add_months(Months::new(1))?)
            }
            Frequency::QuarterEnd => {
                month_end(label.with_day(1)?.checked_add_months(Months::new(3))?)
            }
            Frequency::YearEnd => NaiveDate::from_ymd_opt(label.year() + 1, 12, 31),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::BusinessDay => write!(f, "B"),
            Frequency::Day => write!(f, "D"),
            Frequency::Week(anchor) => write!(f, "W-{}", weekday_alias(*anchor)),
            Frequency::MonthEnd => write!(f, "M"),
            Frequency::BusinessMonthEnd => write!(f, "BM"),
            Frequency::QuarterEnd => write!(f, "Q"),
            Frequency::YearEnd => write!(f, "A"),
        }
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alias = s.trim().to_uppercase();
        match alias.as_str() {
            "B" | "BD" => Ok(Frequency::BusinessDay),
            "D" => Ok(Frequency::Day),
            "W" => Ok(Frequency::Week(Weekday::Sun)),
            "M" | "ME" => Ok(Frequency::MonthEnd),
            "BM" | "BME" => Ok(Frequency::BusinessMonthEnd),
            "Q" | "QE" => Ok(Frequency::QuarterEnd),
            "A" | "Y" | "YE" => Ok(Frequency::YearEnd),
            _ => alias
                .strip_prefix("W-")
                .and_then(|day| day.parse::<Weekday>().ok())
                .map(Frequency::Week)
                .ok_or_else(|| anyhow!("Invalid resample frequency: {}", s)),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("B".parse::<Frequency>().unwrap(), Frequency::BusinessDay);
        assert_eq!("d".parse::<Frequency>().unwrap(), Frequency::Day);
        assert_eq!(
            "W".parse::<Frequency>().unwrap(),
            Frequency::Week(Weekday::Sun)
        );
        assert_eq!(
            "w-fri".parse::<Frequency>().unwrap(),
            Frequency::Week(Weekday::Fri)
        );
        assert_eq!("ME".parse::<Frequency>().unwrap(), Frequency::MonthEnd);
        assert_eq!(
            "BM".parse::<Frequency>().unwrap(),
            Frequency::BusinessMonthEnd
        );
        assert_eq!("Q".parse::<Frequency>().unwrap(), Frequency::QuarterEnd);
        assert_eq!("Y".parse::<Frequency>().unwrap(), Frequency::YearEnd);

        let err = "H".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid resample frequency: H");
        assert!("W-XYZ".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for freq in [
            Frequency::BusinessDay,
            Frequency::Day,
            Frequency::Week(Weekday::Wed),
            Frequency::MonthEnd,
            Frequency::BusinessMonthEnd,
            Frequency::QuarterEnd,
            Frequency::YearEnd,
        ] {
            assert_eq!(freq.to_string().parse::<Frequency>().unwrap(), freq);
        }
    }

    #[test]
    fn test_business_day_rolls_weekend_back_to_friday() {
        let freq = Frequency::BusinessDay;
        // 2020-01-03 is a Friday
        assert_eq!(freq.bucket(date(2020, 1, 3)), Some(date(2020, 1, 3)));
        assert_eq!(freq.bucket(date(2020, 1, 4)), Some(date(2020, 1, 3)));
        assert_eq!(freq.bucket(date(2020, 1, 5)), Some(date(2020, 1, 3)));
        assert_eq!(freq.bucket(date(2020, 1, 6)), Some(date(2020, 1, 6)));

        assert_eq!(freq.next_label(date(2020, 1, 3)), Some(date(2020, 1, 6)));
        assert_eq!(freq.next_label(date(2020, 1, 6)), Some(date(2020, 1, 7)));
    }

    #[test]
    fn test_week_rolls_forward_to_anchor() {
        let freq = Frequency::Week(Weekday::Sun);
        assert_eq!(freq.bucket(date(2020, 1, 1)), Some(date(2020, 1, 5)));
        assert_eq!(freq.bucket(date(2020, 1, 5)), Some(date(2020, 1, 5)));
        assert_eq!(freq.bucket(date(2020, 1, 6)), Some(date(2020, 1, 12)));
        assert_eq!(freq.next_label(date(2020, 1, 5)), Some(date(2020, 1, 12)));
    }

    #[test]
    fn test_month_and_quarter_ends() {
        assert_eq!(
            Frequency::MonthEnd.bucket(date(2020, 2, 10)),
            Some(date(2020, 2, 29))
        );
        assert_eq!(
            Frequency::MonthEnd.next_label(date(2020, 1, 31)),
            Some(date(2020, 2, 29))
        );
        assert_eq!(
            Frequency::MonthEnd.next_label(date(2020, 12, 31)),
            Some(date(2021, 1, 31))
        );
        assert_eq!(
            Frequency::QuarterEnd.bucket(date(2020, 5, 15)),
            Some(date(2020, 6, 30))
        );
        assert_eq!(
            Frequency::QuarterEnd.next_label(date(2020, 6, 30)),
            Some(date(2020, 9, 30))
        );
        assert_eq!(
            Frequency::YearEnd.bucket(date(2020, 5, 15)),
            Some(date(2020, 12, 31))
        );
        assert_eq!(
            Frequency::YearEnd.next_label(date(2020, 12, 31)),
            Some(date(2021, 12, 31))
        );
    }

    #[test]
    fn test_business_month_end() {
        let freq = Frequency::BusinessMonthEnd;
        // May 2020 ends on a Sunday, last business day is Friday the 29th
        assert_eq!(freq.bucket(date(2020, 5, 12)), Some(date(2020, 5, 29)));
        assert_eq!(freq.bucket(date(2020, 5, 29)), Some(date(2020, 5, 29)));
        // A weekend date after the last business day belongs to next month
        assert_eq!(freq.bucket(date(2020, 5, 30)), Some(date(2020, 6, 30)));
        assert_eq!(freq.next_label(date(2020, 5, 29)), Some(date(2020, 6, 30)));
    }
}
