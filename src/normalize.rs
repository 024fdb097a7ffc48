//! Raw extraction output to canonical [`AssignmentRecord`].

use sha2::{Digest, Sha256};

use crate::models::{AssignmentRecord, IdSource, RawRecord, UNKNOWN_CLIENT};
use crate::utils::normalize_ws;

const NOT_LISTED: &str = "Not listed";
const HASH_PREFIX_LEN: usize = 16;

/// Total and pure: every missing field gets its default, nothing is read
/// besides `raw`.
pub fn normalize(raw: &RawRecord) -> AssignmentRecord {
    let (id, id_source) = derive_id(raw);

    let client_name = clean(&raw.client_name).unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    let scheduled_time = clean(&raw.scheduled_time).unwrap_or_default();
    let duration = clean(&raw.duration).unwrap_or_default();
    // The scheduler shows the client's site in place of a separate location.
    let location = clean(&raw.location).unwrap_or_else(|| client_name.clone());
    let description = describe(&client_name, &scheduled_time, &duration);

    AssignmentRecord {
        id,
        client_name,
        scheduled_time,
        duration,
        location,
        description,
        id_source,
    }
}

/// Page identifier, else a hash of the row text, else the extraction
/// sequence number.
pub fn derive_id(raw: &RawRecord) -> (String, IdSource) {
    if let Some(id) = clean(&raw.row_id) {
        return (id, IdSource::Page);
    }

    let cells: Vec<String> = raw
        .cells
        .iter()
        .map(|c| normalize_ws(c))
        .filter(|c| !c.is_empty())
        .collect();
    if !cells.is_empty() {
        let digest = Sha256::digest(cells.join("|").as_bytes());
        let hex = hex::encode(digest);
        return (
            format!("row-{}", &hex[..HASH_PREFIX_LEN]),
            IdSource::RowHash,
        );
    }

    (format!("synthetic-{}", raw.sequence), IdSource::Synthetic)
}

fn describe(client: &str, time: &str, duration: &str) -> String {
    let duration = match duration {
        "" => NOT_LISTED.to_string(),
        d if d.chars().all(|c| c.is_ascii_digit()) => format!("{d} minutes"),
        d => d.to_string(),
    };
    let time = if time.is_empty() { NOT_LISTED } else { time };
    format!("Duration: {duration}\nTime: {time}\nClient: {client}")
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(normalize_ws)
        .filter(|v| !v.is_empty())
}
