use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use citycat_core::CityId;

use crate::event::Event;

/// Envelope for a published event, containing city scope + ordering metadata.
///
/// Notes:
/// - `city_id` is `None` for changes that affect every market (e.g. a reorder).
/// - `sequence_number` is monotonically increasing per publisher, so consumers can
///   detect gaps after a lagging subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    city_id: Option<CityId>,
    event_type: String,
    event_version: u32,
    sequence_number: u64,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        city_id: Option<CityId>,
        event_type: impl Into<String>,
        event_version: u32,
        sequence_number: u64,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            city_id,
            event_type: event_type.into(),
            event_version,
            sequence_number,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn city_id(&self) -> Option<CityId> {
        self.city_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Whether a subscriber filtering on `city` should see this envelope.
    ///
    /// Global events are visible to every city filter.
    pub fn is_visible_to(&self, city: CityId) -> bool {
        self.city_id.is_none_or(|c| c == city)
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, copying its metadata into the envelope.
    pub fn wrap(event: E, sequence_number: u64) -> Self {
        Self::new(
            Uuid::now_v7(),
            event.city_id(),
            event.event_type(),
            event.version(),
            sequence_number,
            event.occurred_at(),
            event,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Touched {
        city: Option<CityId>,
        at: DateTime<Utc>,
    }

    impl Event for Touched {
        fn event_type(&self) -> &'static str {
            "test.touched"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn city_id(&self) -> Option<CityId> {
            self.city
        }
    }

    #[test]
    fn wrap_copies_event_metadata() {
        let city = CityId::new();
        let at = Utc::now();
        let env = EventEnvelope::wrap(Touched { city: Some(city), at }, 9);

        assert_eq!(env.city_id(), Some(city));
        assert_eq!(env.event_type(), "test.touched");
        assert_eq!(env.event_version(), 2);
        assert_eq!(env.sequence_number(), 9);
        assert_eq!(env.occurred_at(), at);
    }

    #[test]
    fn global_events_are_visible_to_every_city() {
        let env = EventEnvelope::wrap(Touched { city: None, at: Utc::now() }, 1);
        assert!(env.is_visible_to(CityId::new()));
    }

    #[test]
    fn scoped_events_are_hidden_from_other_cities() {
        let city = CityId::new();
        let env = EventEnvelope::wrap(Touched { city: Some(city), at: Utc::now() }, 1);
        assert!(env.is_visible_to(city));
        assert!(!env.is_visible_to(CityId::new()));
    }

    #[test]
    fn serializes_camel_case_metadata_around_the_payload() {
        let env = EventEnvelope::wrap(Touched { city: None, at: Utc::now() }, 3);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["eventId"], env.event_id().to_string());
        assert_eq!(json["eventType"], "test.touched");
        assert_eq!(json["sequenceNumber"], 3);
        assert!(json["cityId"].is_null());
        assert!(json["payload"].get("at").is_some());
    }
}
