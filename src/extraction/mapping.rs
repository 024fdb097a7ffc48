//! Cell-to-field mapping for one row.
//!
//! Three passes, each only filling fields the previous ones left empty and
//! only using cells nobody has claimed yet:
//! 1. semantic column markers (authoritative),
//! 2. content shape (schedule-like, short digits, free text),
//! 3. fixed column positions.

use crate::utils::squash_key;

/// Attributes that carry a semantic column id, in lookup order.
pub const MARKER_ATTRIBUTES: &[&str] = &["col-id", "data-field", "data-column", "data-col"];

/// Attributes that carry a stable row identifier, in lookup order.
pub const ROW_ID_ATTRIBUTES: &[&str] = &["row-id", "data-row-id", "data-id", "data-job-id"];

/// Longest digit-only cell still treated as a duration.
const MAX_DURATION_DIGITS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub marker: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: None,
        }
    }

    pub fn marked(text: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: Some(marker.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    RowId,
    Client,
    Schedule,
    Duration,
    Location,
}

/// Last-resort layout: cell index -> field.
const POSITIONAL_LAYOUT: &[(usize, Field)] = &[
    (0, Field::RowId),
    (1, Field::Client),
    (2, Field::Schedule),
    (3, Field::Duration),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedFields {
    pub row_id: Option<String>,
    pub client_name: Option<String>,
    pub scheduled_time: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
}

impl MappedFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::RowId => &mut self.row_id,
            Field::Client => &mut self.client_name,
            Field::Schedule => &mut self.scheduled_time,
            Field::Duration => &mut self.duration,
            Field::Location => &mut self.location,
        }
    }

    fn is_set(&mut self, field: Field) -> bool {
        self.slot(field).is_some()
    }
}

pub fn field_for_marker(marker: &str) -> Option<Field> {
    match squash_key(marker).as_str() {
        "customername" | "customer" | "clientname" | "client" | "consumername" | "patientname"
        | "requestor" => Some(Field::Client),
        "appointmenttime" | "appointmentdate" | "scheduledtime" | "schedule" | "starttime"
        | "startdate" | "datetime" | "date" | "time" => Some(Field::Schedule),
        "duration" | "durationminutes" | "minutes" | "length" => Some(Field::Duration),
        "location" | "address" | "facility" | "site" | "venue" => Some(Field::Location),
        "jobid" | "jobnumber" | "jobno" | "appointmentid" | "id" => Some(Field::RowId),
        _ => None,
    }
}

/// Date/time-like: at least one digit plus a date or clock separator or a
/// meridiem marker.
pub fn looks_like_schedule(text: &str) -> bool {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if text.contains('/') || text.contains(':') {
        return true;
    }
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .flat_map(split_digit_suffix)
        .any(|token| {
            let t = token.to_ascii_lowercase();
            t == "am" || t == "pm"
        })
}

/// "10AM" -> ["10", "AM"]; other tokens pass through unchanged.
fn split_digit_suffix(token: &str) -> Vec<&str> {
    match token.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) if idx > 0 => vec![&token[..idx], &token[idx..]],
        _ => vec![token],
    }
}

pub fn looks_like_duration(text: &str) -> bool {
    !text.is_empty()
        && text.len() <= MAX_DURATION_DIGITS
        && text.chars().all(|c| c.is_ascii_digit())
}

/// Digits with optional numeric punctuation, e.g. `12345`, `1,200`, `7.5`.
pub fn is_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '#'))
}

pub fn map_cells(cells: &[Cell]) -> MappedFields {
    let mut fields = MappedFields::default();
    let mut claimed = vec![false; cells.len()];

    // Pass 1: semantic markers.
    for (idx, cell) in cells.iter().enumerate() {
        if cell.text.is_empty() {
            continue;
        }
        let Some(field) = cell.marker.as_deref().and_then(field_for_marker) else {
            continue;
        };
        if !fields.is_set(field) {
            *fields.slot(field) = Some(cell.text.clone());
            claimed[idx] = true;
        }
    }

    // Pass 2: content shape. Of several short-digit cells only the rightmost
    // is the duration; the others are left for the positional pass.
    let duration_at = (0..cells.len()).rev().find(|&idx| {
        let text = cells[idx].text.as_str();
        !claimed[idx] && looks_like_duration(text) && !looks_like_schedule(text)
    });
    for (idx, cell) in cells.iter().enumerate() {
        if claimed[idx] || cell.text.is_empty() {
            continue;
        }
        let text = cell.text.as_str();
        let field = if looks_like_schedule(text) {
            Field::Schedule
        } else if looks_like_duration(text) {
            if duration_at != Some(idx) {
                continue;
            }
            Field::Duration
        } else if !is_numeric(text) {
            Field::Client
        } else {
            continue;
        };
        if !fields.is_set(field) {
            *fields.slot(field) = Some(cell.text.clone());
            claimed[idx] = true;
        }
    }

    // Pass 3: fixed positions.
    for &(idx, field) in POSITIONAL_LAYOUT {
        let Some(cell) = cells.get(idx) else {
            continue;
        };
        if claimed[idx] || cell.text.is_empty() || fields.is_set(field) {
            continue;
        }
        if field == Field::RowId && !is_numeric(&cell.text) {
            continue;
        }
        *fields.slot(field) = Some(cell.text.clone());
        claimed[idx] = true;
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(texts: &[&str]) -> Vec<Cell> {
        texts.iter().map(|t| Cell::new(*t)).collect()
    }

    #[test]
    fn shape_heuristics() {
        assert!(looks_like_schedule("10:00 AM"));
        assert!(looks_like_schedule("03/14/2025"));
        assert!(looks_like_schedule("10AM"));
        assert!(looks_like_schedule("Mar 3, 2 pm"));
        assert!(!looks_like_schedule("N/A"));
        assert!(!looks_like_schedule("Amherst Clinic"));
        assert!(looks_like_duration("60"));
        assert!(!looks_like_duration("12345"));
        assert!(!looks_like_duration("60 min"));
        assert!(is_numeric("12345"));
        assert!(!is_numeric("Acme Corp"));
    }

    #[test]
    fn markers_are_authoritative_over_positions() {
        let cells = vec![
            Cell::new("Riverside"),
            Cell::new("Dr. Smith"),
            Cell::marked("Acme Corp", "customerName"),
        ];
        let fields = map_cells(&cells);
        assert_eq!(fields.client_name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn heuristics_map_unmarked_row() {
        let fields = map_cells(&plain(&["12345", "10:00 AM", "60", "Acme Corp"]));
        assert_eq!(fields.scheduled_time.as_deref(), Some("10:00 AM"));
        assert_eq!(fields.duration.as_deref(), Some("60"));
        assert_eq!(fields.client_name.as_deref(), Some("Acme Corp"));
        // The leftover leading number is picked up by position as the job id.
        assert_eq!(fields.row_id.as_deref(), Some("12345"));
    }

    #[test]
    fn marker_for_one_field_leaves_others_to_heuristics() {
        let cells = vec![
            Cell::marked("90", "duration"),
            Cell::new("Acme Corp"),
            Cell::new("04/02/2025 09:30"),
            Cell::new("45"),
        ];
        let fields = map_cells(&cells);
        assert_eq!(fields.duration.as_deref(), Some("90"));
        assert_eq!(fields.client_name.as_deref(), Some("Acme Corp"));
        assert_eq!(fields.scheduled_time.as_deref(), Some("04/02/2025 09:30"));
    }

    #[test]
    fn positional_fallback_fills_what_shapes_cannot() {
        // Two free-text cells: the first becomes the client by shape, the
        // schedule is not time-shaped so it comes from its column.
        let fields = map_cells(&plain(&["778", "Acme Corp", "Tomorrow", "30"]));
        assert_eq!(fields.row_id.as_deref(), Some("778"));
        assert_eq!(fields.client_name.as_deref(), Some("Acme Corp"));
        assert_eq!(fields.duration.as_deref(), Some("30"));
        // "Tomorrow" is free text, but the client slot was already taken.
        assert_eq!(fields.scheduled_time.as_deref(), Some("Tomorrow"));
    }

    #[test]
    fn short_numeric_id_does_not_steal_the_duration() {
        let fields = map_cells(&plain(&["778", "Acme Corp", "10:00 AM", "60"]));
        assert_eq!(fields.duration.as_deref(), Some("60"));
        assert_eq!(fields.row_id.as_deref(), Some("778"));
        assert_eq!(fields.client_name.as_deref(), Some("Acme Corp"));
        assert_eq!(fields.scheduled_time.as_deref(), Some("10:00 AM"));
    }

    #[test]
    fn location_only_from_marker() {
        let cells = vec![
            Cell::marked("Acme Corp", "client"),
            Cell::marked("Main St Clinic", "location"),
        ];
        let fields = map_cells(&cells);
        assert_eq!(fields.location.as_deref(), Some("Main St Clinic"));
    }

    #[test]
    fn empty_row_maps_to_nothing() {
        assert_eq!(map_cells(&[]), MappedFields::default());
    }
}
