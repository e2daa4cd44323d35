use serde::{Deserialize, Serialize};

pub mod client;

pub use client::CourtApiClient;

/// Availability of one bookable hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Occupied,
    Unavailable,
}

/// One court time slot. `start` and `end` are hours of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: u32,
    pub end: u32,
    pub avail: SlotStatus,
}

/// Day schedule for one court, as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub court_id: String,
    pub date: String,
    pub availability: Vec<Slot>,
}

/// Reservation request body for the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub time_slot: Slot,
    pub date: String,
    pub court_id: String,
}

/// Reservation listing returns mixed records from the backend's table;
/// reservation rows are the ones whose sort key carries this prefix.
const RESERVATION_KEY_PREFIX: &str = "RESERVE#";

pub fn is_reservation_record(record: &serde_json::Value) -> bool {
    record
        .get("SK")
        .and_then(|sk| sk.as_str())
        .map(|sk| sk.starts_with(RESERVATION_KEY_PREFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_availability_response_wire_shape() {
        let json = r#"{
            "courtId": "COURT#01",
            "date": "2024-01-01",
            "availability": [
                {"start": 6, "end": 7, "avail": "available"},
                {"start": 7, "end": 8, "avail": "occupied"},
                {"start": 8, "end": 9, "avail": "unavailable"}
            ]
        }"#;

        let response: AvailabilityResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.court_id, "COURT#01");
        assert_eq!(response.availability.len(), 3);
        assert_eq!(response.availability[0].avail, SlotStatus::Available);
        assert_eq!(response.availability[1].avail, SlotStatus::Occupied);
        assert_eq!(response.availability[2].avail, SlotStatus::Unavailable);
    }

    #[test]
    fn test_reservation_request_serializes_camel_case() {
        let request = ReservationRequest {
            time_slot: Slot {
                start: 9,
                end: 10,
                avail: SlotStatus::Available,
            },
            date: "2024-01-01".to_string(),
            court_id: "COURT#01".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["timeSlot"]["start"], 9);
        assert_eq!(value["date"], "2024-01-01");
        assert_eq!(value["courtId"], "COURT#01");
    }

    #[test]
    fn test_reservation_record_filter() {
        assert!(is_reservation_record(&json!({
            "SK": "RESERVE#42",
            "date": "2024-01-01",
            "start": 9,
            "end": 10,
            "courtId": "COURT#01"
        })));

        // Profile rows and malformed records are filtered out
        assert!(!is_reservation_record(&json!({"SK": "PROFILE#abc"})));
        assert!(!is_reservation_record(&json!({"PK": "USER#1"})));
        assert!(!is_reservation_record(&json!({"SK": 42})));
        assert!(!is_reservation_record(&json!("not an object")));
    }
}
