//! Schedule records as delivered by the departures-board collaborator

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AnnounceError, Result};

/// One departure. Immutable once read; on-time status is always derived from the delay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRecord {
    #[serde(rename = "train_number")]
    pub identifier: String,
    pub operator: String,
    pub origin: String,
    pub destination: String,
    /// Departure time as printed on the board (`HH:MM`)
    pub scheduled_time: String,
    pub platform: u32,
    pub delay_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
}

impl ScheduleRecord {
    pub fn is_on_time(&self) -> bool {
        self.delay_minutes == 0
    }

    pub fn is_delayed(&self) -> bool {
        !self.is_on_time()
    }

    /// Reject records with empty text fields. Values are not checked further.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("train_number", &self.identifier),
            ("operator", &self.operator),
            ("origin", &self.origin),
            ("destination", &self.destination),
            ("scheduled_time", &self.scheduled_time),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AnnounceError::InvalidRecord(format!(
                    "field '{}' is empty for train '{}'",
                    name, self.identifier
                )));
            }
        }

        Ok(())
    }

    /// Delay column text for the departures board
    pub fn delay_text(&self) -> String {
        format_delay_text(self.delay_minutes)
    }

    /// Platform column text, with the track appended when known
    pub fn platform_text(&self) -> String {
        match self.track {
            Some(track) => format!("{}/{}", self.platform, track),
            None => self.platform.to_string(),
        }
    }
}

pub fn format_delay_text(delay_minutes: u32) -> String {
    match delay_minutes {
        0 => "On Time".to_string(),
        1 => "+1 min".to_string(),
        n => format!("+{} mins", n),
    }
}

/// Parse a JSON array of records, validating every entry
pub fn parse_schedule(json: &str) -> Result<Vec<ScheduleRecord>> {
    let records: Vec<ScheduleRecord> = serde_json::from_str(json)?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

pub fn load_schedule(path: &Path) -> Result<Vec<ScheduleRecord>> {
    let json = std::fs::read_to_string(path)?;
    let records = parse_schedule(&json)?;
    log::info!("Loaded {} schedule records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
pub(crate) fn sample_record(identifier: &str, destination: &str, delay_minutes: u32) -> ScheduleRecord {
    ScheduleRecord {
        identifier: identifier.to_string(),
        operator: "Amtrak".to_string(),
        origin: "Boston South Station".to_string(),
        destination: destination.to_string(),
        scheduled_time: "21:05".to_string(),
        platform: 3,
        delay_minutes,
        track: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BOARD: &str = r##"[
        {"train_number": "Acela 2426", "train_type": "Acela", "operator": "Amtrak",
         "origin": "Boston South Station", "destination": "New York Penn Station",
         "scheduled_time": "21:05", "delay_minutes": 10, "platform": 7, "track": 2,
         "is_delayed": true},
        {"train_number": "#815", "operator": "Metrolink", "origin": "Houston",
         "destination": "Las Vegas", "scheduled_time": "21:30", "delay_minutes": 0,
         "platform": 12, "track": null}
    ]"##;

    #[test]
    fn test_parse_schedule() {
        let records = parse_schedule(BOARD).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "Acela 2426");
        assert!(records[0].is_delayed());
        assert_eq!(records[0].track, Some(2));
        assert!(records[1].is_on_time());
        assert_eq!(records[1].track, None);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r##"[{"train_number": "#1", "operator": "Amtrak", "origin": "A",
                        "scheduled_time": "10:00", "delay_minutes": 0, "platform": 1}]"##;
        assert!(matches!(parse_schedule(json), Err(AnnounceError::Json(_))));
    }

    #[test]
    fn test_empty_field_rejected() {
        let mut record = sample_record("#1", "Denver Union Station", 0);
        record.operator = "  ".to_string();
        match record.validate() {
            Err(AnnounceError::InvalidRecord(msg)) => assert!(msg.contains("operator")),
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_delay_text() {
        assert_eq!(format_delay_text(0), "On Time");
        assert_eq!(format_delay_text(1), "+1 min");
        assert_eq!(format_delay_text(25), "+25 mins");
    }

    #[test]
    fn test_platform_text() {
        let mut record = sample_record("#1", "Miami Central", 0);
        assert_eq!(record.platform_text(), "3");
        record.track = Some(4);
        assert_eq!(record.platform_text(), "3/4");
    }

    #[test]
    fn test_load_schedule_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BOARD.as_bytes()).unwrap();
        let records = load_schedule(file.path()).unwrap();
        assert_eq!(records[1].destination, "Las Vegas");
    }
}
