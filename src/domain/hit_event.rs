//! Hit event model for asynchronous usage accounting.

/// A successful redirect waiting to be counted.
///
/// Sent from the redirect handler to the hit worker over a bounded channel
/// so the response never waits on the counter update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitEvent {
    /// Id of the resolved record.
    pub id: i64,
    /// Raw inbound segment, kept for log context.
    pub segment: String,
}

impl HitEvent {
    pub fn new(id: i64, segment: impl Into<String>) -> Self {
        Self {
            id,
            segment: segment.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_event_creation() {
        let event = HitEvent::new(42, "promo");
        assert_eq!(event.id, 42);
        assert_eq!(event.segment, "promo");
    }
}
