//! Event sinks for pipeline observability.
//!
//! The orchestrator reports every state change and stage outcome to an
//! [`EventSink`]. Sinks are passed in explicitly; there is no global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
