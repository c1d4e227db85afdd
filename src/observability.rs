use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("wormzero.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("wormzero.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("wormzero.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("wormzero.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("wormzero.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("wormzero.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("wormzero.stream.fragments");

pub(crate) static CHAT_TURNS: Counter = Counter::new("wormzero.chat.turns");
pub(crate) static CHAT_TURN_FAILURES: Counter = Counter::new("wormzero.chat.turn_failures");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("wormzero.chat.turn_duration_seconds");
pub(crate) static CHAT_SESSION_RESETS: Counter = Counter::new("wormzero.chat.session_resets");

pub(crate) static STORE_ERRORS: Counter = Counter::new("wormzero.store.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_FAILURES);
    collector.register_moments(&CHAT_TURN_DURATION);
    collector.register_counter(&CHAT_SESSION_RESETS);

    collector.register_counter(&STORE_ERRORS);
}
