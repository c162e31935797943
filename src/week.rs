use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::StoreError;
use crate::store::SheetStore;

lazy_static! {
    /// Two `MM-DD-YYYY` dates joined by an underscore at the start of a title
    static ref WEEK_TITLE_REGEX: Regex =
        Regex::new(r"^(\d{2}-\d{2}-\d{4})_\d{2}-\d{2}-\d{4}").unwrap();
}

const DATE_FORMAT: &str = "%m-%d-%Y";

/// Start date encoded in a week worksheet title
///
/// Titles that do not start with the two-date pattern, or whose first date is
/// not a real date, get `NaiveDate::MIN` so they sort after every real week.
pub fn start_date(title: &str) -> NaiveDate {
    WEEK_TITLE_REGEX
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok())
        .unwrap_or(NaiveDate::MIN)
}

/// Most recent week worksheet
///
/// Ties keep spreadsheet order. Only a title with a parsable start date can
/// win; `None` when there is none.
pub fn latest_week<S: AsRef<str>>(titles: &[S]) -> Option<String> {
    let mut best: Option<(NaiveDate, &str)> = None;
    for title in titles {
        let title = title.as_ref();
        let date = start_date(title);
        if date == NaiveDate::MIN {
            continue;
        }
        if best.is_none_or(|(d, _)| date > d) {
            best = Some((date, title));
        }
    }
    best.map(|(_, title)| title.to_string())
}

/// Candidate weeks for the report view, newest first
///
/// Keeps titles made of exactly two underscore-separated parts and orders them
/// by the date before the underscore; malformed dates go last.
pub fn report_weeks<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let mut weeks: Vec<(NaiveDate, String)> = titles
        .iter()
        .map(|t| t.as_ref())
        .filter(|t| t.matches('_').count() == 1)
        .map(|t| {
            let start = t.split('_').next().unwrap_or_default();
            let date = NaiveDate::parse_from_str(start, DATE_FORMAT).unwrap_or(NaiveDate::MIN);
            (date, t.to_string())
        })
        .collect();
    // stable: equal dates keep spreadsheet order
    weeks.sort_by(|a, b| b.0.cmp(&a.0));
    weeks.into_iter().map(|(_, t)| t).collect()
}

/// Enumerate worksheets and pick the latest week
pub async fn resolve_latest_week(store: &dyn SheetStore) -> Result<Option<String>, StoreError> {
    let titles = store.worksheet_titles().await?;
    Ok(latest_week(&titles))
}

/// Enumerate worksheets and build the report view's week list
pub async fn resolve_report_weeks(store: &dyn SheetStore) -> Result<Vec<String>, StoreError> {
    let titles = store.worksheet_titles().await?;
    Ok(report_weeks(&titles))
}
