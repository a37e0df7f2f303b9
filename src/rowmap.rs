//! Mapping between raw spreadsheet rows and typed field values.
//!
//! Sheet columns are addressed by their localized header labels, never by
//! position, so reordering columns in the spreadsheet does not corrupt writes.
//! Required labels are validated against the actual header row before any
//! table is touched.

use crate::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("sheet is missing required headers: {}", .0.join(", "))]
pub(crate) struct MissingHeaders(pub(crate) Vec<String>);

/// Positions of the labels in a sheet's header row.
pub(crate) struct HeaderIndex {
    labels: Vec<String>,
}

impl HeaderIndex {
    pub(crate) fn new(header_row: &[String]) -> Self {
        Self {
            labels: header_row.iter().map(|label| label.trim().to_owned()).collect(),
        }
    }

    pub(crate) fn validate(&self, required: &[&str]) -> Result<(), MissingHeaders> {
        let missing = required.iter()
            .filter(|label| self.position(label).is_none())
            .map(|&label| label.to_owned())
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingHeaders(missing))
        }
    }

    pub(crate) fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|candidate| candidate == label)
    }

    pub(crate) fn width(&self) -> usize {
        self.labels.len()
    }

    /// The cell under `label`, trimmed. Unknown labels and rows shorter than the
    /// header yield the empty string.
    pub(crate) fn value<'r>(&self, row: &'r [String], label: &str) -> &'r str {
        self.position(label)
            .and_then(|idx| row.get(idx))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }

    /// A full-width row with each value placed under its header and every other
    /// cell blank. Row updates overwrite the entire row, so columns the caller
    /// does not supply are cleared.
    pub(crate) fn make_row(&self, values: &[(&str, String)]) -> Vec<String> {
        let mut row = vec![String::new(); self.labels.len()];
        for (label, value) in values {
            if let Some(idx) = self.position(label) {
                row[idx] = value.clone();
            }
        }
        row
    }
}

/// Behavior of [`parse_sheet_date`] for input it cannot parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum DateFallback {
    #[default]
    Null,
    Now,
}

/// Parses a date cell. The sheet contains both `DD.MM.YYYY` (manual entry) and
/// `MM/DD/YYYY` (Google's US locale reformatting).
pub(crate) fn parse_sheet_date(raw: &str, fallback: DateFallback) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .or_else(|| match fallback {
            DateFallback::Null => None,
            DateFallback::Now => Some(Utc::now().date_naive()),
        })
}

pub(crate) fn format_sheet_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%d.%m.%Y").to_string()).unwrap_or_default()
}

/// Parses a `HH:MM:SS` duration cell to milliseconds. Two components are taken
/// as `MM:SS` with a zero hour, which is how short episodes appear in the sheet.
pub(crate) fn parse_duration_ms(raw: &str) -> Option<i64> {
    let mut parts = raw.trim().split(':').map(|part| part.trim().parse::<i64>().ok()).collect::<Vec<_>>();
    if parts.len() == 2 {
        parts.insert(0, Some(0));
    }
    let [hours, minutes, seconds] = <[Option<i64>; 3]>::try_from(parts).ok()?;
    Some(((hours? * 60 + minutes?) * 60 + seconds?) * 1000)
}

pub(crate) fn format_duration_ms(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    format!("{:02}:{:02}:{:02}", total_seconds / 3600, total_seconds / 60 % 60, total_seconds % 60)
}

/// Tri-state host vote: 👍 for, ❌ against, blank for no opinion.
pub(crate) fn parse_reaction(raw: &str) -> Option<bool> {
    match raw.trim() {
        "👍" => Some(true),
        "❌" => Some(false),
        _ => None,
    }
}

pub(crate) fn format_reaction(vote: Option<bool>) -> String {
    match vote {
        Some(true) => "👍",
        Some(false) => "❌",
        None => "",
    }.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderIndex {
        HeaderIndex::new(&["Дата".to_owned(), "Выпуск".to_owned(), "Название".to_owned()])
    }

    #[test]
    fn value_by_label() {
        let header = header();
        let row = vec!["01.02.2023".to_owned(), "5".to_owned()];
        assert_eq!(header.value(&row, "Выпуск"), "5");
        assert_eq!(header.value(&row, "Название"), "", "short row defaults to empty");
        assert_eq!(header.value(&row, "Гость"), "", "unknown label defaults to empty");
    }

    #[test]
    fn make_row_matches_header_order() {
        let header = header();
        let row = header.make_row(&[("Название", "Тест".to_owned()), ("Выпуск", "5".to_owned())]);
        assert_eq!(row, ["", "5", "Тест"]);
    }

    #[test]
    fn validate_reports_missing_labels() {
        let err = header().validate(&["Дата", "Гость"]).unwrap_err();
        assert_eq!(err.0, ["Гость"]);
        assert!(header().validate(&["Дата", "Выпуск"]).is_ok());
    }

    #[test]
    fn parses_both_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert_eq!(parse_sheet_date("01.02.2023", DateFallback::Null), Some(expected));
        assert_eq!(parse_sheet_date("02/01/2023", DateFallback::Null), Some(expected));
    }

    #[test]
    fn invalid_date_follows_fallback_policy() {
        assert_eq!(parse_sheet_date("скоро", DateFallback::Null), None);
        assert_eq!(parse_sheet_date("скоро", DateFallback::Now), Some(Utc::now().date_naive()));
    }

    #[test]
    fn date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
        assert_eq!(parse_sheet_date(&format_sheet_date(Some(date)), DateFallback::Null), Some(date));
        assert_eq!(format_sheet_date(None), "");
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration_ms("02:01:04"), Some(((2 * 60 + 1) * 60 + 4) * 1000));
        assert_eq!(parse_duration_ms("03:02"), Some((3 * 60 + 2) * 1000), "two components are MM:SS");
        assert_eq!(parse_duration_ms(""), None);
        assert_eq!(parse_duration_ms("1:2:3:4"), None);
        assert_eq!(parse_duration_ms("abc"), None);
    }

    #[test]
    fn duration_formatting_exceeds_24_hours() {
        assert_eq!(format_duration_ms(300 * 3600 * 1000), "300:00:00");
        assert_eq!(format_duration_ms(0), "00:00:00");
    }

    #[test]
    fn reaction_round_trip() {
        for vote in [Some(true), Some(false), None] {
            assert_eq!(parse_reaction(&format_reaction(vote)), vote);
        }
        assert_eq!(parse_reaction("да"), None, "anything unrecognized is no opinion");
    }
}
