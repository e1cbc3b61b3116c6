use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

/// Error attached to a captured event.
///
/// `tracing` hands errors to subscribers as borrowed `dyn Error`, so the
/// captured form keeps its rendered parts: the `Display` text, the `Debug`
/// text and the `Display` text of every source in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub debug: String,
    pub sources: Vec<String>,
}

impl ErrorInfo {
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            sources.push(cause.to_string());
            source = cause.source();
        }

        ErrorInfo {
            message: error.to_string(),
            debug: format!("{:?}", error),
            sources,
        }
    }
}

/// Normalized, immutable record of one captured event.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    template: String,
    formatted_message: String,
    level: String,
    logger_name: Option<String>,
    timestamp: DateTime<Utc>,
    arguments: Vec<String>,
    error: Option<ErrorInfo>,
    diagnostic_context: BTreeMap<String, String>,
    fields: BTreeMap<String, serde_json::Value>,
    module_path: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

impl LogEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        template: String,
        formatted_message: String,
        level: String,
        logger_name: Option<String>,
        timestamp: DateTime<Utc>,
        arguments: Vec<String>,
        error: Option<ErrorInfo>,
        diagnostic_context: BTreeMap<String, String>,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        LogEvent {
            template,
            formatted_message,
            level,
            logger_name,
            timestamp,
            arguments,
            error,
            diagnostic_context,
            fields,
            module_path: None,
            file: None,
            line: None,
        }
    }

    /// Source location of the call that logged the event.
    pub fn with_location(mut self, module_path: Option<String>, file: Option<String>, line: Option<u32>) -> Self {
        self.module_path = module_path;
        self.file = file;
        self.line = line;
        self
    }

    /// Unformatted message, e.g. `"Press {} to continue"`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Message after argument substitution.
    pub fn formatted_message(&self) -> &str {
        &self.formatted_message
    }

    /// Upper-case level label: `TRACE`, `DEBUG`, `INFO`, `WARN` or `ERROR`.
    pub fn level(&self) -> &str {
        &self.level
    }

    /// The level parsed back into a [`tracing::Level`].
    pub fn level_value(&self) -> Option<tracing::Level> {
        self.level.parse().ok()
    }

    pub fn logger_name(&self) -> Option<&str> {
        self.logger_name.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn diagnostic_context(&self) -> &BTreeMap<String, String> {
        &self.diagnostic_context
    }

    /// Structured `tracing` fields recorded with the event.
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
