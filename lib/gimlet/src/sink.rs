//! Logger and tracer sinks.
//!
//! A [`Connection`](crate::Connection) reports every exchange to two sinks:
//! the *tracer* receives a record when a request starts, the *logger* one
//! when it completes or fails. Both default to [`NullSink`].
//!
//! Any `Fn(&Record<'_>)` closure is a sink:
//!
//! ```
//! use gimlet::{Record, Sink};
//!
//! let sink = |record: &Record<'_>| eprintln!("{} {}", record.method, record.uri);
//! # fn assert_sink(_: impl Sink) {}
//! # assert_sink(sink);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use serde_json::Value;
use tracing::{Level, debug, error, info, trace, warn};

use crate::{Error, Method};

/// One event reported by a [`Connection`](crate::Connection).
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Severity of the event.
    pub level: Level,
    /// Short description.
    pub message: &'a str,
    /// Method of the request.
    pub method: Method,
    /// Request URI as built from the endpoint (relative to the host).
    pub uri: &'a str,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Time spent in the pipeline; zero for start records.
    pub elapsed: Duration,
    /// Failure, for failure records.
    pub error: Option<&'a Error>,
    /// Request body on start records, decoded response body on completion.
    pub body: Option<&'a Value>,
}

/// Receiver of [`Record`]s.
pub trait Sink: Send + Sync + 'static {
    /// Handle one record. Panics are caught and discarded by the caller.
    fn record(&self, record: &Record<'_>);
}

impl<F> Sink for F
where
    F: Fn(&Record<'_>) + Send + Sync + 'static,
{
    fn record(&self, record: &Record<'_>) {
        self(record);
    }
}

/// Sink discarding every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn record(&self, _record: &Record<'_>) {}
}

/// Sink forwarding records to `tracing` events at the record's level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! forward {
    ($macro:ident, $record:ident, $elapsed_ms:ident) => {
        $macro!(
            target: "gimlet::connection",
            method = %$record.method,
            uri = $record.uri,
            status = $record.status,
            elapsed_ms = $elapsed_ms,
            error = $record.error.map(tracing::field::display),
            "{}",
            $record.message
        )
    };
}

impl Sink for TracingSink {
    fn record(&self, record: &Record<'_>) {
        let elapsed_ms = u64::try_from(record.elapsed.as_millis()).unwrap_or(u64::MAX);
        match record.level {
            Level::ERROR => forward!(error, record, elapsed_ms),
            Level::WARN => forward!(warn, record, elapsed_ms),
            Level::INFO => forward!(info, record, elapsed_ms),
            Level::DEBUG => forward!(debug, record, elapsed_ms),
            _ => forward!(trace, record, elapsed_ms),
        }
    }
}

/// Deliver a record, swallowing any panic raised by the sink.
pub(crate) fn emit(sink: &dyn Sink, record: &Record<'_>) {
    if catch_unwind(AssertUnwindSafe(|| sink.record(record))).is_err() {
        warn!(record = record.message, "sink panicked; record dropped");
    }
}
