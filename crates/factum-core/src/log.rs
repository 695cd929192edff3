//! Event sink for observational messages.
//!
//! Components take an explicit sink object instead of reaching for global
//! logging state. The default [`TracingSink`] forwards to `tracing`;
//! [`NullSink`] drops everything. Sinks never affect control flow.

/// Leveled text-message sink.
pub trait EventSink: Send + Sync {
    /// Informational message.
    fn info(&self, msg: &str);

    /// Warning message.
    fn warn(&self, msg: &str);
}

/// Default sink: forwards to the `tracing` macros.
///
/// With no subscriber installed the messages go nowhere, which makes
/// this a safe default for library use.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }
}

/// Sink that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinks_are_object_safe() {
        let sinks: Vec<Box<dyn EventSink>> = vec![Box::new(TracingSink), Box::new(NullSink)];
        for s in &sinks {
            s.info("hello");
            s.warn("world");
        }
    }
}
