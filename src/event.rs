use crate::message::Message;
use crate::record::ErrorInfo;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::Level;

static LAST_CAPTURE_MILLIS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current time in epoch milliseconds, never smaller than a value this
/// function returned before.
pub fn capture_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_CAPTURE_MILLIS.fetch_max(now, Ordering::AcqRel);
    previous.max(now)
}

/// Event as the engine sees it, before mapping into a [`LogEvent`].
///
/// Built once per `tracing` event by the routing layer and shared between
/// all sinks it is delivered to.
///
/// [`LogEvent`]: crate::record::LogEvent
#[derive(Debug, Clone)]
pub struct NativeEvent {
    level: Level,
    logger_name: String,
    message: Message,
    time_millis: i64,
    thrown: Option<ErrorInfo>,
    context_data: BTreeMap<String, String>,
    fields: BTreeMap<String, serde_json::Value>,
    module_path: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl NativeEvent {
    /// New event stamped with [`capture_millis`].
    pub fn new(level: Level, logger_name: impl Into<String>, message: Message) -> Self {
        NativeEvent {
            level,
            logger_name: logger_name.into(),
            message,
            time_millis: capture_millis(),
            thrown: None,
            context_data: BTreeMap::new(),
            fields: BTreeMap::new(),
            module_path: None,
            file: None,
            line: None,
        }
    }

    pub fn with_time_millis(mut self, time_millis: i64) -> Self {
        self.time_millis = time_millis;
        self
    }

    pub fn with_thrown(mut self, thrown: ErrorInfo) -> Self {
        self.thrown = Some(thrown);
        self
    }

    pub fn with_context_data(mut self, context_data: BTreeMap<String, String>) -> Self {
        self.context_data = context_data;
        self
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, serde_json::Value>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_location(
        mut self,
        module_path: Option<&str>,
        file: Option<&str>,
        line: Option<u32>,
    ) -> Self {
        self.module_path = module_path.map(str::to_owned);
        self.file = file.map(str::to_owned);
        self.line = line;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Target of the event, used to route it through the engine tree.
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn time_millis(&self) -> i64 {
        self.time_millis
    }

    pub fn thrown(&self) -> Option<&ErrorInfo> {
        self.thrown.as_ref()
    }

    pub fn context_data(&self) -> &BTreeMap<String, String> {
        &self.context_data
    }

    pub fn fields(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.fields
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_clock_never_goes_backwards() {
        let mut last = capture_millis();
        for _ in 0..1_000 {
            let next = capture_millis();
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn builder_sets_optional_parts() {
        let mut context = BTreeMap::new();
        context.insert("req-id".to_string(), "abc".to_string());

        let event = NativeEvent::new(Level::WARN, "app::db", Message::simple("slow query"))
            .with_time_millis(1_000)
            .with_context_data(context)
            .with_location(Some("app::db"), Some("src/db.rs"), Some(12));

        assert_eq!(event.level(), Level::WARN);
        assert_eq!(event.logger_name(), "app::db");
        assert_eq!(event.time_millis(), 1_000);
        assert_eq!(event.context_data().get("req-id").map(String::as_str), Some("abc"));
        assert_eq!(event.file(), Some("src/db.rs"));
        assert_eq!(event.line(), Some(12));
        assert!(event.thrown().is_none());
    }
}
