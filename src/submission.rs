use std::collections::HashMap;

use thiserror::Error;

use crate::error::StoreError;
use crate::range::CellRef;
use crate::report::Day;
use crate::store::SheetStore;

/// An input of the submission form and the worksheet row it lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricField {
    /// Form field name
    pub name: &'static str,
    pub label: &'static str,
    pub row: u32,
}

const fn field(name: &'static str, label: &'static str, row: u32) -> MetricField {
    MetricField { name, label, row }
}

/// Per-unit metrics people enter by hand; totals and averages are sheet formulas
pub const METRIC_FIELDS: [MetricField; 12] = [
    field("oee_–_die_cut_1_(1st_shift)", "OEE – Die Cut 1 (1st Shift)", 6),
    field("oee_–_die_cut_2_(1st_shift)", "OEE – Die Cut 2 (1st Shift)", 7),
    field("pounds_–_die_cut_1_(1st_shift)", "Pounds – Die Cut 1 (1st Shift)", 9),
    field("pounds_–_die_cut_2_(1st_shift)", "Pounds – Die Cut 2 (1st Shift)", 10),
    field("waste_–_die_cut_1_(1st_shift)", "Waste – Die Cut 1 (1st Shift)", 12),
    field("waste_–_die_cut_2_(1st_shift)", "Waste – Die Cut 2 (1st Shift)", 13),
    field("oee_–_die_cut_1_(2nd_shift)", "OEE – Die Cut 1 (2nd Shift)", 20),
    field("oee_–_die_cut_2_(2nd_shift)", "OEE – Die Cut 2 (2nd Shift)", 21),
    field("pounds_–_die_cut_1_(2nd_shift)", "Pounds – Die Cut 1 (2nd Shift)", 23),
    field("pounds_–_die_cut_2_(2nd_shift)", "Pounds – Die Cut 2 (2nd Shift)", 24),
    field("waste_–_die_cut_1_(2nd_shift)", "Waste – Die Cut 1 (2nd Shift)", 26),
    field("waste_–_die_cut_2_(2nd_shift)", "Waste – Die Cut 2 (2nd Shift)", 27),
];

pub const MSG_UPDATED: &str = "Submission successful.";
pub const MSG_NOTHING_NEW: &str = "No data was submitted (already exists).";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid week or day provided.")]
    InvalidInput,

    #[error("Sheet/tab not found: {0}")]
    WeekNotFound(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// A parsed submission form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub week: String,
    pub day: Day,
    pub submitted_by: String,
    pub local_timestamp: String,
    /// Non-blank metric inputs, in form order
    pub values: Vec<(MetricField, String)>,
}

impl Submission {
    /// Build from raw form fields; week and a known day are required
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, SubmitError> {
        let get = |name: &str| form.get(name).map(|v| v.trim()).unwrap_or_default();

        let week = get("week");
        if week.is_empty() {
            return Err(SubmitError::InvalidInput);
        }
        let day = Day::from_name(get("day")).ok_or(SubmitError::InvalidInput)?;

        let values = METRIC_FIELDS
            .iter()
            .filter_map(|f| {
                let v = get(f.name);
                (!v.is_empty()).then(|| (*f, v.to_string()))
            })
            .collect();

        Ok(Submission {
            week: week.to_string(),
            day,
            submitted_by: get("submitted_by").to_string(),
            local_timestamp: get("local_timestamp").to_string(),
            values,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Cells that received a value
    pub written: Vec<CellRef>,
}

impl SubmissionOutcome {
    pub fn updated(&self) -> bool {
        !self.written.is_empty()
    }

    pub fn message(&self) -> &'static str {
        if self.updated() { MSG_UPDATED } else { MSG_NOTHING_NEW }
    }
}

/// Write submitted metrics into the day's column of a week worksheet
///
/// A cell is only written when it is empty or holds `0`, so values entered
/// earlier are never overwritten.
pub async fn submit_metrics(
    store: &dyn SheetStore,
    submission: &Submission,
) -> Result<SubmissionOutcome, SubmitError> {
    let titles = store.worksheet_titles().await?;
    if !titles.iter().any(|t| *t == submission.week) {
        return Err(SubmitError::WeekNotFound(submission.week.clone()));
    }

    let column = submission.day.column();
    let mut written = Vec::new();
    for (field, value) in &submission.values {
        let cell = CellRef::new(column, field.row);
        let current = store.cell_value(&submission.week, cell).await?;
        let open = current.as_deref().is_none_or(|c| c.trim().is_empty() || c.trim() == "0");
        if open {
            store.update_cell(&submission.week, cell, value).await?;
            written.push(cell);
        }
    }

    Ok(SubmissionOutcome { written })
}

/// Append `[name, email, timestamp, message, week, day]` to the log worksheet
///
/// Logging must never fail a submission; errors are only reported.
pub async fn log_submission(
    store: &dyn SheetStore,
    log_sheet: &str,
    email: &str,
    submission: &Submission,
    message: &str,
) {
    let row = vec![
        submission.submitted_by.clone(),
        email.to_string(),
        submission.local_timestamp.clone(),
        message.to_string(),
        submission.week.clone(),
        submission.day.name().to_string(),
    ];
    if let Err(e) = store.append_row(log_sheet, row).await {
        log::warn!("Failed to log submission for {}: {}", email, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const WEEK: &str = "02-05-2024_02-11-2024";

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rows_match_the_shift_bands() {
        assert!(METRIC_FIELDS[..6].iter().all(|f| (6..=14).contains(&f.row)));
        assert!(METRIC_FIELDS[6..].iter().all(|f| (20..=28).contains(&f.row)));
    }

    #[test]
    fn form_requires_week_and_known_day() {
        assert!(matches!(
            Submission::from_form(&form(&[("day", "Monday")])),
            Err(SubmitError::InvalidInput)
        ));
        assert!(matches!(
            Submission::from_form(&form(&[("week", WEEK), ("day", "Sunday")])),
            Err(SubmitError::InvalidInput)
        ));

        let s = Submission::from_form(&form(&[
            ("week", WEEK),
            ("day", "Tuesday"),
            ("oee_–_die_cut_1_(1st_shift)", " 85 "),
            ("oee_–_die_cut_2_(1st_shift)", "  "),
        ]))
        .unwrap();
        assert_eq!(s.day, Day::Tuesday);
        assert_eq!(s.values.len(), 1);
        assert_eq!(s.values[0].1, "85");
    }

    #[tokio::test]
    async fn only_empty_or_zero_cells_are_written() {
        let store = MemoryStore::new().with_empty_sheet(WEEK);
        store.set_cell(WEEK, CellRef::new(5, 7), "0");
        store.set_cell(WEEK, CellRef::new(5, 9), "1200");

        let s = Submission::from_form(&form(&[
            ("week", WEEK),
            ("day", "Tuesday"),
            ("oee_–_die_cut_1_(1st_shift)", "85"),
            ("oee_–_die_cut_2_(1st_shift)", "80"),
            ("pounds_–_die_cut_1_(1st_shift)", "999"),
        ]))
        .unwrap();
        let outcome = submit_metrics(&store, &s).await.unwrap();

        assert_eq!(outcome.written, vec![CellRef::new(5, 6), CellRef::new(5, 7)]);
        assert_eq!(outcome.message(), MSG_UPDATED);
        assert_eq!(store.peek(WEEK, CellRef::new(5, 6)).as_deref(), Some("85"));
        assert_eq!(store.peek(WEEK, CellRef::new(5, 7)).as_deref(), Some("80"));
        assert_eq!(store.peek(WEEK, CellRef::new(5, 9)).as_deref(), Some("1200"));
    }

    #[tokio::test]
    async fn nothing_new_when_all_filled() {
        let store = MemoryStore::new().with_empty_sheet(WEEK);
        store.set_cell(WEEK, CellRef::new(4, 20), "70");
        let s = Submission::from_form(&form(&[
            ("week", WEEK),
            ("day", "Monday"),
            ("oee_–_die_cut_1_(2nd_shift)", "75"),
        ]))
        .unwrap();
        let outcome = submit_metrics(&store, &s).await.unwrap();
        assert!(!outcome.updated());
        assert_eq!(outcome.message(), MSG_NOTHING_NEW);
    }

    #[tokio::test]
    async fn unknown_week_is_reported() {
        let store = MemoryStore::new().with_empty_sheet(WEEK);
        let s = Submission::from_form(&form(&[("week", "nope"), ("day", "Monday")])).unwrap();
        let err = submit_metrics(&store, &s).await.unwrap_err();
        assert!(matches!(err, SubmitError::WeekNotFound(ref w) if w == "nope"));
    }

    #[tokio::test]
    async fn log_row_layout_and_swallowed_failure() {
        let store = MemoryStore::new().with_empty_sheet("submit_logs");
        let s = Submission::from_form(&form(&[
            ("week", WEEK),
            ("day", "Friday"),
            ("submitted_by", "Alice Smith"),
            ("local_timestamp", "2/9/2024, 3:00 PM"),
        ]))
        .unwrap();
        log_submission(&store, "submit_logs", "alice@example.com", &s, MSG_UPDATED).await;
        let rows = store.rows("submit_logs").unwrap();
        assert_eq!(
            rows[0],
            vec![
                "Alice Smith",
                "alice@example.com",
                "2/9/2024, 3:00 PM",
                MSG_UPDATED,
                WEEK,
                "Friday"
            ]
        );

        // missing log sheet: no panic, no error surfaced
        log_submission(&store, "absent", "alice@example.com", &s, MSG_UPDATED).await;
    }
}
