use crate::event::NativeEvent;
use crate::record::LogEvent;
use chrono::{DateTime, TimeZone, Utc};

/// Map an engine event into a [`LogEvent`].
///
/// Pure and total: every part of the record comes from the event, optional
/// parts stay absent, collections are copied.
pub fn to_log_event(event: &NativeEvent) -> LogEvent {
    let message = event.message();
    let logger_name = Some(event.logger_name())
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    LogEvent::new(
        message.template().to_owned(),
        message.formatted().to_owned(),
        event.level().to_string(),
        logger_name,
        utc_from_millis(event.time_millis()),
        message.parameters().to_vec(),
        event.thrown().cloned(),
        event.context_data().clone(),
        event.fields().clone(),
    )
    .with_location(
        event.module_path().map(str::to_owned),
        event.file().map(str::to_owned),
        event.line(),
    )
}

/// Out-of-range values fall back to the Unix epoch.
fn utc_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

impl From<&NativeEvent> for LogEvent {
    fn from(event: &NativeEvent) -> Self {
        to_log_event(event)
    }
}
