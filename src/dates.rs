use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

const MONTH_NAMES: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Parse a stored date, reordering `DD/MM/YYYY` to ISO first.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let iso = if raw.contains('/') {
        raw.split('/').rev().collect::<Vec<_>>().join("-")
    } else {
        raw.to_string()
    };

    if let Ok(date) = NaiveDate::parse_from_str(&iso, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(&iso) {
        return Some(stamp.date_naive());
    }
    NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|stamp| stamp.date())
        .ok()
}

/// Zero-based month slot, January is 0.
pub fn month_index(date: NaiveDate) -> usize {
    date.month0() as usize
}

pub fn year_string(date: NaiveDate) -> String {
    format!("{:04}", date.year())
}

/// The dashboard's year selector: every year, or one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Self::All => true,
            Self::Year(year) => date.year() == *year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
            return value
                .parse::<i32>()
                .map(Self::Year)
                .map_err(|err| err.to_string());
        }
        Err(format!("expected \"all\" or a four digit year, got \"{value}\""))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Year(year) => write!(f, "{year:04}"),
        }
    }
}

pub fn matches_year_filter(date: NaiveDate, selected: YearFilter) -> bool {
    selected.matches(date)
}

/// A single calendar month used by the time-sheet view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSelection {
    pub year: i32,
    pub month: u32,
}

impl MonthSelection {
    /// Resolve the year and 1-based month selectors. "All years" falls back
    /// to the year of `today`.
    pub fn resolve(year: YearFilter, month: u32, today: NaiveDate) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let year = match year {
            YearFilter::All => today.year(),
            YearFilter::Year(year) => year,
        };
        Some(Self { year, month })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

/// Monday-to-Sunday week containing a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// ISO date of the week's Monday.
    pub fn key(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn label(&self) -> String {
        format!(
            "Semaine du {:02} {} au {:02} {} {}",
            self.start.day(),
            MONTH_NAMES[self.start.month0() as usize],
            self.end.day(),
            MONTH_NAMES[self.end.month0() as usize],
            self.end.year()
        )
    }
}

pub fn iso_week_range(date: NaiveDate) -> WeekRange {
    let offset = u64::from(date.weekday().num_days_from_monday());
    let start = date - Days::new(offset);
    WeekRange {
        start,
        end: start + Days::new(6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn normalizes_iso_and_day_first_dates() {
        assert_eq!(normalize_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(normalize_date("05/03/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(normalize_date(" 2024-12-31 "), Some(ymd(2024, 12, 31)));
    }

    #[test]
    fn normalizes_timestamps_to_their_date() {
        assert_eq!(normalize_date("2024-03-05T10:15:00Z"), Some(ymd(2024, 3, 5)));
        assert_eq!(normalize_date("2024-03-05T10:15:00"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn unparseable_dates_are_none() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("invalid"), None);
        assert_eq!(normalize_date("31/02/2024"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
    }

    #[test]
    fn month_and_year_accessors() {
        let date = ymd(2024, 1, 15);
        assert_eq!(month_index(date), 0);
        assert_eq!(month_index(ymd(2024, 12, 1)), 11);
        assert_eq!(year_string(date), "2024");
    }

    #[test]
    fn year_filter_parses_and_matches() {
        assert_eq!("all".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("2024".parse::<YearFilter>(), Ok(YearFilter::Year(2024)));
        assert!("24".parse::<YearFilter>().is_err());
        assert!("year".parse::<YearFilter>().is_err());

        let date = ymd(2024, 6, 1);
        assert!(matches_year_filter(date, YearFilter::All));
        assert!(matches_year_filter(date, YearFilter::Year(2024)));
        assert!(!matches_year_filter(date, YearFilter::Year(2023)));
        assert_eq!(YearFilter::Year(2024).to_string(), "2024");
    }

    #[test]
    fn week_range_starts_on_monday() {
        // 2024-03-07 is a Thursday.
        let week = iso_week_range(ymd(2024, 3, 7));
        assert_eq!(week.start, ymd(2024, 3, 4));
        assert_eq!(week.end, ymd(2024, 3, 10));
        assert_eq!(week.key(), "2024-03-04");

        let monday = iso_week_range(ymd(2024, 3, 4));
        assert_eq!(monday.start, ymd(2024, 3, 4));
        let sunday = iso_week_range(ymd(2024, 3, 10));
        assert_eq!(sunday.start, ymd(2024, 3, 4));
    }

    #[test]
    fn week_label_is_french() {
        let week = iso_week_range(ymd(2024, 2, 28));
        assert_eq!(week.label(), "Semaine du 26 février au 03 mars 2024");
    }

    #[test]
    fn month_selection_falls_back_to_current_year() {
        let today = ymd(2025, 7, 14);
        let selection = MonthSelection::resolve(YearFilter::All, 3, today).unwrap();
        assert_eq!(selection, MonthSelection { year: 2025, month: 3 });

        let explicit = MonthSelection::resolve(YearFilter::Year(2023), 12, today).unwrap();
        assert!(explicit.contains(ymd(2023, 12, 31)));
        assert!(!explicit.contains(ymd(2024, 12, 31)));
        assert_eq!(explicit.label(), "décembre 2023");

        assert!(MonthSelection::resolve(YearFilter::All, 0, today).is_none());
        assert!(MonthSelection::resolve(YearFilter::All, 13, today).is_none());
    }
}
