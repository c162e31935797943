use serde::Serialize;
use thiserror::Error;

use crate::error::StoreError;
use crate::range::ColumnRange;
use crate::store::{RangeValues, SheetStore};

/// Sentinel for a cell the store did not return
pub const PLACEHOLDER: &str = "-";

/// Rows per shift band: three metric families of (unit 1, unit 2, total)
pub const BAND_ROWS: usize = 9;

/// Running averages sit in column I next to the five day columns
const AVERAGE_COLUMN: u16 = 9;

/// Working day of a week worksheet; each owns one column (D..H)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Day::ALL.into_iter().find(|d| d.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }

    /// Column number of this day's values (D = 4)
    pub fn column(&self) -> u16 {
        match self {
            Day::Monday => 4,
            Day::Tuesday => 5,
            Day::Wednesday => 6,
            Day::Thursday => 7,
            Day::Friday => 8,
        }
    }
}

/// Row band of a week worksheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    First,
    Second,
    Both,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::First, Shift::Second, Shift::Both];

    pub fn from_name(name: &str) -> Option<Self> {
        Shift::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shift::First => "First Shift",
            Shift::Second => "Second Shift",
            Shift::Both => "Both Shift",
        }
    }

    /// First and last row of the band
    pub fn rows(&self) -> (u32, u32) {
        match self {
            Shift::First => (6, 14),
            Shift::Second => (20, 28),
            Shift::Both => (34, 42),
        }
    }

    /// Metric values of the band for one day
    pub fn metric_range(&self, day: Day) -> ColumnRange {
        let (start, end) = self.rows();
        ColumnRange::new(day.column(), start, end)
    }

    /// Running averages of the band
    pub fn average_range(&self) -> ColumnRange {
        let (start, end) = self.rows();
        ColumnRange::new(AVERAGE_COLUMN, start, end)
    }

    /// Row of the combined OEE of both die cuts
    pub fn oee_total_row(&self) -> u32 {
        self.rows().0 + 2
    }

    /// Row of the combined waste, the last row of the band
    pub fn waste_total_row(&self) -> u32 {
        self.rows().1
    }
}

/// Rejected `/api/report` parameters
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid parameters")]
pub struct InvalidQuery;

/// A validated report request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub week: String,
    pub day: Day,
    pub shift: Shift,
}

impl ReportQuery {
    /// Validate raw query parameters; nothing remote is touched
    pub fn parse(
        week: Option<&str>,
        day: Option<&str>,
        shift: Option<&str>,
    ) -> Result<Self, InvalidQuery> {
        let week = week.filter(|w| !w.is_empty()).ok_or(InvalidQuery)?;
        let day = day.and_then(Day::from_name).ok_or(InvalidQuery)?;
        let shift = shift.and_then(Shift::from_name).ok_or(InvalidQuery)?;
        Ok(ReportQuery {
            week: week.to_string(),
            day,
            shift,
        })
    }

    pub fn metric_range(&self) -> ColumnRange {
        self.shift.metric_range(self.day)
    }

    pub fn average_range(&self) -> ColumnRange {
        self.shift.average_range()
    }
}

/// Values of one shift band for one day, plus the band's running averages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub oee1: String,
    pub oee2: String,
    pub oee_total: String,
    pub pounds1: String,
    pub pounds2: String,
    pub pounds_total: String,
    pub waste1: String,
    pub waste2: String,
    pub waste_total: String,
    pub oee1_avg: String,
    pub oee2_avg: String,
    pub oee_total_avg: String,
    pub pounds1_avg: String,
    pub pounds2_avg: String,
    pub pounds_total_avg: String,
    pub waste1_avg: String,
    pub waste2_avg: String,
    pub waste_total_avg: String,
}

impl ReportResult {
    fn from_columns(metric: [String; BAND_ROWS], average: [String; BAND_ROWS]) -> Self {
        let [oee1, oee2, oee_total, pounds1, pounds2, pounds_total, waste1, waste2, waste_total] =
            metric;
        let [
            oee1_avg,
            oee2_avg,
            oee_total_avg,
            pounds1_avg,
            pounds2_avg,
            pounds_total_avg,
            waste1_avg,
            waste2_avg,
            waste_total_avg,
        ] = average;
        ReportResult {
            oee1,
            oee2,
            oee_total,
            pounds1,
            pounds2,
            pounds_total,
            waste1,
            waste2,
            waste_total,
            oee1_avg,
            oee2_avg,
            oee_total_avg,
            pounds1_avg,
            pounds2_avg,
            pounds_total_avg,
            waste1_avg,
            waste2_avg,
            waste_total_avg,
        }
    }
}

/// One scalar per band row, keeping positions when rows are missing
///
/// Returns the values and how many positions were filled with the placeholder.
pub fn flatten_band(rows: RangeValues) -> ([String; BAND_ROWS], usize) {
    let mut filled = 0;
    let mut rows = rows.into_iter();
    let values = std::array::from_fn(|_| {
        match rows.next().and_then(|row| row.into_iter().next()) {
            Some(value) => value,
            None => {
                filled += 1;
                PLACEHOLDER.to_string()
            }
        }
    });
    (values, filled)
}

/// Read one shift band of a week worksheet
///
/// One batched read of the metric column and the average column.
pub async fn fetch_report(
    store: &dyn SheetStore,
    query: &ReportQuery,
) -> Result<ReportResult, StoreError> {
    let ranges = [query.metric_range(), query.average_range()];
    let mut batch = store.batch_get(&query.week, &ranges).await?.into_iter();
    let (Some(metric_rows), Some(average_rows)) = (batch.next(), batch.next()) else {
        return Err(StoreError::Malformed(
            "batch read returned fewer ranges than requested".to_string(),
        ));
    };

    let (metric, metric_missing) = flatten_band(metric_rows);
    let (average, average_missing) = flatten_band(average_rows);
    if metric_missing + average_missing > 0 {
        log::warn!(
            "Report for '{}' {} {}: {} metric and {} average cells missing",
            query.week,
            query.day.name(),
            query.shift.name(),
            metric_missing,
            average_missing
        );
    }

    Ok(ReportResult::from_columns(metric, average))
}

/// Rows read for the weekly view: first-shift OEE total through both-shift waste total
const WEEKLY_FIRST_ROW: u32 = 8;
const WEEKLY_LAST_ROW: u32 = 42;

/// Week-at-a-glance numbers for the dashboard
///
/// Daily series are Monday through Friday. Blank cells count as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMetrics {
    pub week: String,
    pub oee: Vec<f64>,
    pub waste: Vec<f64>,
    pub oee_avg: f64,
    pub waste_avg: f64,
    pub oee_first_shift: Vec<f64>,
    pub waste_first_shift: Vec<f64>,
    pub oee_second_shift: Vec<f64>,
    pub waste_second_shift: Vec<f64>,
}

/// Numeric value of a metric cell; blank is zero
///
/// Percent signs and thousands separators from formatted cells are ignored.
pub fn parse_metric(text: &str) -> Result<f64, StoreError> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    cleaned
        .parse()
        .map_err(|_| StoreError::Malformed(format!("not a number: {:?}", text)))
}

fn weekly_cell(column: &RangeValues, row: u32) -> Result<f64, StoreError> {
    let index = row.saturating_sub(WEEKLY_FIRST_ROW) as usize;
    let text = column
        .get(index)
        .and_then(|r| r.first())
        .map(String::as_str)
        .unwrap_or_default();
    parse_metric(text)
}

/// Read the weekly totals of a week worksheet
///
/// One batched read: rows 8-42 of each day column and of the average column.
pub async fn fetch_weekly(store: &dyn SheetStore, week: &str) -> Result<WeeklyMetrics, StoreError> {
    let mut ranges: Vec<ColumnRange> = Day::ALL
        .iter()
        .map(|d| ColumnRange::new(d.column(), WEEKLY_FIRST_ROW, WEEKLY_LAST_ROW))
        .collect();
    ranges.push(ColumnRange::new(AVERAGE_COLUMN, WEEKLY_FIRST_ROW, WEEKLY_LAST_ROW));

    let columns = store.batch_get(week, &ranges).await?;
    if columns.len() != ranges.len() {
        return Err(StoreError::Malformed(format!(
            "asked for {} ranges, got {}",
            ranges.len(),
            columns.len()
        )));
    }
    let (days, averages) = columns.split_at(Day::ALL.len());
    let across = |row: u32| -> Result<Vec<f64>, StoreError> {
        days.iter().map(|column| weekly_cell(column, row)).collect()
    };
    let average = &averages[0];

    Ok(WeeklyMetrics {
        week: week.to_string(),
        oee: across(Shift::Both.oee_total_row())?,
        waste: across(Shift::Both.waste_total_row())?,
        oee_avg: weekly_cell(average, Shift::Both.oee_total_row())?,
        waste_avg: weekly_cell(average, Shift::Both.waste_total_row())?,
        oee_first_shift: across(Shift::First.oee_total_row())?,
        waste_first_shift: across(Shift::First.waste_total_row())?,
        oee_second_shift: across(Shift::Second.oee_total_row())?,
        waste_second_shift: across(Shift::Second.waste_total_row())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::CellRef;
    use crate::store::MemoryStore;

    const WEEK: &str = "02-05-2024_02-11-2024";

    fn week_store() -> MemoryStore {
        let store = MemoryStore::new().with_empty_sheet(WEEK);
        for (i, row) in (20..=28).enumerate() {
            store.set_cell(WEEK, CellRef::new(6, row), &format!("wed{}", i));
            store.set_cell(WEEK, CellRef::new(9, row), &format!("avg{}", i));
        }
        store
    }

    #[test]
    fn day_and_shift_names() {
        assert_eq!(Day::from_name("Wednesday"), Some(Day::Wednesday));
        assert_eq!(Day::from_name("wednesday"), None);
        assert_eq!(Day::from_name("Saturday"), None);
        assert_eq!(Shift::from_name("Both Shift"), Some(Shift::Both));
        assert_eq!(Shift::from_name("Night Shift"), None);
    }

    #[test]
    fn ranges_for_every_day_and_shift() {
        assert_eq!(Shift::First.metric_range(Day::Monday).to_string(), "D6:D14");
        assert_eq!(Shift::First.metric_range(Day::Friday).to_string(), "H6:H14");
        assert_eq!(Shift::Second.metric_range(Day::Tuesday).to_string(), "E20:E28");
        assert_eq!(Shift::Both.metric_range(Day::Thursday).to_string(), "G34:G42");
        assert_eq!(Shift::Both.average_range().to_string(), "I34:I42");
        for day in Day::ALL {
            for shift in Shift::ALL {
                let range = shift.metric_range(day);
                assert_eq!(range.len(), BAND_ROWS);
                assert_eq!(range.column, day.column());
            }
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(
            ReportQuery::parse(Some(WEEK), Some("Funday"), Some("First Shift")),
            Err(InvalidQuery)
        );
        assert_eq!(
            ReportQuery::parse(Some(WEEK), Some("Monday"), Some("Third Shift")),
            Err(InvalidQuery)
        );
        assert_eq!(
            ReportQuery::parse(None, Some("Monday"), Some("First Shift")),
            Err(InvalidQuery)
        );
        assert_eq!(
            ReportQuery::parse(Some(""), Some("Monday"), Some("First Shift")),
            Err(InvalidQuery)
        );
        assert_eq!(ReportQuery::parse(Some(WEEK), None, Some("First Shift")), Err(InvalidQuery));

        let query = ReportQuery::parse(Some(WEEK), Some("Monday"), Some("First Shift")).unwrap();
        assert_eq!(query.day, Day::Monday);
        assert_eq!(query.shift, Shift::First);
    }

    #[test]
    fn flatten_pads_and_keeps_positions() {
        let rows = vec![vec!["a".to_string()], vec![], vec!["c".to_string(), "extra".to_string()]];
        let (values, filled) = flatten_band(rows);
        assert_eq!(values[0], "a");
        assert_eq!(values[1], PLACEHOLDER);
        assert_eq!(values[2], "c");
        assert!(values[3..].iter().all(|v| v == PLACEHOLDER));
        assert_eq!(filled, 7);
    }

    #[tokio::test]
    async fn fetch_maps_positions_to_fields() {
        let store = week_store();
        let query =
            ReportQuery::parse(Some(WEEK), Some("Wednesday"), Some("Second Shift")).unwrap();
        let report = fetch_report(&store, &query).await.unwrap();
        assert_eq!(store.calls(), 1);

        assert_eq!(report.oee1, "wed0");
        assert_eq!(report.oee_total, "wed2");
        assert_eq!(report.pounds1, "wed3");
        assert_eq!(report.pounds_total, "wed5");
        assert_eq!(report.waste_total, "wed8");
        assert_eq!(report.oee1_avg, "avg0");
        assert_eq!(report.waste_total_avg, "avg8");
    }

    #[tokio::test]
    async fn short_average_column_fills_placeholders() {
        let store = week_store();
        for row in 23..=28 {
            store.set_cell(WEEK, CellRef::new(9, row), "");
        }
        let query =
            ReportQuery::parse(Some(WEEK), Some("Wednesday"), Some("Second Shift")).unwrap();
        let report = fetch_report(&store, &query).await.unwrap();

        assert_eq!(report.waste_total, "wed8");
        assert_eq!(report.oee_total_avg, "avg2");
        assert_eq!(report.pounds1_avg, PLACEHOLDER);
        assert_eq!(report.waste1_avg, PLACEHOLDER);
        assert_eq!(report.waste2_avg, PLACEHOLDER);
        assert_eq!(report.waste_total_avg, PLACEHOLDER);
    }

    #[tokio::test]
    async fn unknown_week_is_not_found() {
        let store = week_store();
        let query = ReportQuery::parse(
            Some("01-01-1999_01-07-1999"),
            Some("Monday"),
            Some("Both Shift"),
        )
        .unwrap();
        let err = fetch_report(&store, &query).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn json_field_names() {
        let (metric, _) = flatten_band(Vec::new());
        let (average, _) = flatten_band(Vec::new());
        let json = serde_json::to_value(ReportResult::from_columns(metric, average)).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 18);
        for key in [
            "oee1", "oee2", "oeeTotal", "pounds1", "pounds2", "poundsTotal", "waste1", "waste2",
            "wasteTotal", "oee1Avg", "oee2Avg", "oeeTotalAvg", "pounds1Avg", "pounds2Avg",
            "poundsTotalAvg", "waste1Avg", "waste2Avg", "wasteTotalAvg",
        ] {
            assert_eq!(obj.get(key).and_then(|v| v.as_str()), Some(PLACEHOLDER), "{}", key);
        }
    }

    #[test]
    fn weekly_rows_are_band_totals() {
        assert_eq!(Shift::First.oee_total_row(), 8);
        assert_eq!(Shift::First.waste_total_row(), 14);
        assert_eq!(Shift::Second.oee_total_row(), 22);
        assert_eq!(Shift::Second.waste_total_row(), 28);
        assert_eq!(Shift::Both.oee_total_row(), 36);
        assert_eq!(Shift::Both.waste_total_row(), 42);
    }

    #[test]
    fn metric_text_to_number() {
        assert_eq!(parse_metric("").unwrap(), 0.0);
        assert_eq!(parse_metric("  ").unwrap(), 0.0);
        assert_eq!(parse_metric("82.5").unwrap(), 82.5);
        assert_eq!(parse_metric("85%").unwrap(), 85.0);
        assert_eq!(parse_metric("1,250").unwrap(), 1250.0);
        assert!(matches!(parse_metric("n/a"), Err(StoreError::Malformed(_))));
    }

    #[tokio::test]
    async fn weekly_blank_cells_count_as_zero() {
        let store = MemoryStore::new().with_empty_sheet(WEEK);
        store.set_cell(WEEK, CellRef::new(4, 36), "80");
        store.set_cell(WEEK, CellRef::new(6, 36), "90");
        store.set_cell(WEEK, CellRef::new(8, 42), "3.5");
        store.set_cell(WEEK, CellRef::new(9, 36), "85");
        store.set_cell(WEEK, CellRef::new(5, 8), "70");
        store.set_cell(WEEK, CellRef::new(7, 28), "1.25");

        let weekly = fetch_weekly(&store, WEEK).await.unwrap();
        assert_eq!(store.calls(), 1);
        assert_eq!(weekly.week, WEEK);
        assert_eq!(weekly.oee, vec![80.0, 0.0, 90.0, 0.0, 0.0]);
        assert_eq!(weekly.waste, vec![0.0, 0.0, 0.0, 0.0, 3.5]);
        assert_eq!(weekly.oee_avg, 85.0);
        assert_eq!(weekly.waste_avg, 0.0);
        assert_eq!(weekly.oee_first_shift, vec![0.0, 70.0, 0.0, 0.0, 0.0]);
        assert_eq!(weekly.waste_first_shift, vec![0.0; 5]);
        assert_eq!(weekly.oee_second_shift, vec![0.0; 5]);
        assert_eq!(weekly.waste_second_shift, vec![0.0, 0.0, 0.0, 1.25, 0.0]);
    }

    #[tokio::test]
    async fn weekly_on_missing_week_is_not_found() {
        let store = MemoryStore::new();
        let err = fetch_weekly(&store, WEEK).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
