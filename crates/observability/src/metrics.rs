//! Metric catalogue
//!
//! Names and help text for every metric the router emits. Emitting sites
//! use the `metrics` macros directly with these names.

use metrics::{describe_counter, describe_gauge, Unit};

pub mod names {
    pub const MESSAGES_RECEIVED: &str = "relay_messages_received_total";
    pub const MALFORMED_EVENTS: &str = "relay_malformed_events_total";
    pub const EVENTS_RECEIVED: &str = "relay_events_received_total";
    pub const EVENTS_EXCLUDED: &str = "relay_events_excluded_total";
    pub const DELIVERIES: &str = "relay_deliveries_total";
    pub const DEAD_LETTERS: &str = "relay_dead_letters_total";
    pub const FIXITY_OUTCOMES: &str = "relay_fixity_outcomes_total";
    pub const SINK_QUEUE_DEPTH: &str = "relay_sink_queue_depth";
}

/// Register help text with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        names::MESSAGES_RECEIVED,
        Unit::Count,
        "Transport messages read by ingestion"
    );
    describe_counter!(
        names::MALFORMED_EVENTS,
        Unit::Count,
        "Messages rejected during normalization"
    );
    describe_counter!(
        names::EVENTS_RECEIVED,
        Unit::Count,
        "Events taken off a route queue, by route"
    );
    describe_counter!(
        names::EVENTS_EXCLUDED,
        Unit::Count,
        "Events dropped under an excluded container, by route"
    );
    describe_counter!(
        names::DELIVERIES,
        Unit::Count,
        "Successful sink deliveries, by route and destination"
    );
    describe_counter!(
        names::DEAD_LETTERS,
        Unit::Count,
        "Messages that exhausted redelivery, by route and destination"
    );
    describe_counter!(
        names::FIXITY_OUTCOMES,
        Unit::Count,
        "Fixity verifications, by outcome"
    );
    describe_gauge!(
        names::SINK_QUEUE_DEPTH,
        Unit::Count,
        "Messages waiting in a sink worker queue"
    );
}
