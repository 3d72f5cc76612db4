//! Wire-level frames sent to trip feed sockets.
//!
//! Every sink callback becomes one JSON text frame tagged by `type`:
//!
//! ```json
//! {"type":"loading","loading":true}
//! {"type":"trip","trip":{"slug":"porto","name":"Porto",...}}
//! {"type":"days","days":[{"id":"d1","slots":[...]}]}
//! {"type":"error","error":{"code":"not_found","message":"..."}}
//! ```

use serde::Serialize;

use crate::domain::{DayWithSlots, Error, Trip};

/// Outbound frame payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Latest trip document; `null` once deleted.
    Trip { trip: Option<Trip> },
    /// Latest nested itinerary.
    Days { days: Vec<DayWithSlots> },
    /// User-facing failure.
    Error { error: Error },
    /// Whether the first complete view is still pending.
    Loading { loading: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::test_support::fixtures::trip_record;
    use serde_json::{Value, json};

    fn encode(message: &FeedMessage) -> Value {
        serde_json::to_value(message).expect("frames serialise")
    }

    #[test]
    fn frames_are_tagged_by_type() {
        assert_eq!(
            encode(&FeedMessage::Loading { loading: true }),
            json!({ "type": "loading", "loading": true })
        );
        assert_eq!(
            encode(&FeedMessage::Days { days: Vec::new() }),
            json!({ "type": "days", "days": [] })
        );
        assert_eq!(
            encode(&FeedMessage::Trip { trip: None }),
            json!({ "type": "trip", "trip": null })
        );
    }

    #[test]
    fn errors_carry_code_and_message() {
        let frame = encode(&FeedMessage::Error {
            error: Error::new(ErrorCode::Forbidden, "ask the organiser"),
        });
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["error"]["code"], "forbidden");
        assert_eq!(frame["error"]["message"], "ask the organiser");
    }

    #[test]
    fn trips_use_camel_case_fields() {
        let frame = encode(&FeedMessage::Trip {
            trip: Some(trip_record("t1", "porto").trip),
        });
        assert_eq!(frame["trip"]["slug"], "porto");
        assert_eq!(frame["trip"]["memberIds"], json!([]));
    }
}
