use crate::event::NativeEvent;
use crate::sink::LogSink;
use chrono::{SecondsFormat, TimeZone, Utc};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::fmt::{MakeWriter, TestWriter};

/// Name of the console sink registered on the engine.
pub const CONSOLE_SINK_NAME: &str = "console";

/// Console-style sink writing one line per event:
/// `2024-01-01T00:00:00.000Z  INFO app::service: message {key=value}`.
///
/// Defaults to [`TestWriter`] so the output goes through libtest's capture.
pub struct ConsoleSink<W = TestWriter> {
    make_writer: W,
}

impl ConsoleSink<TestWriter> {
    pub fn new() -> Self {
        ConsoleSink {
            make_writer: TestWriter::default(),
        }
    }
}

impl Default for ConsoleSink<TestWriter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> ConsoleSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    pub fn with_writer(make_writer: W) -> Self {
        ConsoleSink { make_writer }
    }
}

pub(crate) fn render_line(event: &NativeEvent) -> String {
    let timestamp = Utc
        .timestamp_millis_opt(event.time_millis())
        .single()
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut line = format!(
        "{} {:>5} {}: {}",
        timestamp,
        event.level().to_string(),
        event.logger_name(),
        event.message().formatted()
    );

    if !event.context_data().is_empty() {
        let pairs: Vec<String> = event
            .context_data()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        line.push_str(&format!(" {{{}}}", pairs.join(", ")));
    }
    if let Some(error) = event.thrown() {
        line.push_str(&format!(" error={}", error.message));
    }
    line.push('\n');
    line
}

impl<W> LogSink for ConsoleSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync,
{
    fn name(&self) -> &str {
        CONSOLE_SINK_NAME
    }

    fn append(&self, event: &Arc<NativeEvent>) {
        let line = render_line(event);
        let mut writer = self.make_writer.make_writer();
        if let Err(e) = writer.write_all(line.as_bytes()) {
            eprintln!("console sink write failed: {}", e);
        }
    }
}
