//! Per-test capture sessions.
//!
//! ```ignore
//! use tracing_log_capture::LogCaptor;
//!
//! let captor = LogCaptor::for_type::<FooService>()?;
//! FooService::default().say_hello();
//! assert_eq!(captor.info_logs(), vec!["Keyboard not responding. Press any key to continue..."]);
//! ```

use crate::backend::{self, BackendError};
use crate::console::CONSOLE_SINK_NAME;
use crate::engine::{EngineHandle, ROOT};
use crate::filter::Filter;
use crate::mapper;
use crate::record::LogEvent;
use crate::sink::{CaptureSink, LogSink};
use std::any::type_name;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Name of the in-memory sink a captor attaches to its node. At most one
/// sink with this name lives on a node; attaching a new captor replaces a
/// leftover one.
pub const CAPTURE_SINK_NAME: &str = "log-capture";

/// Captures the events routed to one engine node (and everything below it).
///
/// Level changes made through a captor (`set_level_*`, [`disable_logs`])
/// modify the shared engine and outlive the captor: [`close`] and `Drop`
/// only stop collecting. Call [`reset_level`] to go back to the level the
/// node had before the first captor on that name was created.
///
/// [`disable_logs`]: LogCaptor::disable_logs
/// [`close`]: LogCaptor::close
/// [`reset_level`]: LogCaptor::reset_level
pub struct LogCaptor {
    name: String,
    engine: EngineHandle,
    sink: Arc<CaptureSink>,
    closed: AtomicBool,
}

impl LogCaptor {
    /// Capture every event of the engine.
    pub fn for_root() -> Result<Self, BackendError> {
        Self::for_name(ROOT)
    }

    /// Capture events logged from the module that defines `T`.
    ///
    /// The target is derived from [`type_name`], which only names a module
    /// for types declared at module level. A type declared inside a function
    /// yields `module::function`, which matches no `tracing` target; use
    /// [`for_module`](LogCaptor::for_module) with `module_path!()` there.
    /// Types that are not paths (tuples, slices, references, trait objects)
    /// are used by their full type name and capture nothing.
    pub fn for_type<T: ?Sized>() -> Result<Self, BackendError> {
        Self::for_name(&type_target::<T>())
    }

    /// Capture events whose target lies below `module_path`, usually
    /// `module_path!()`.
    pub fn for_module(module_path: &str) -> Result<Self, BackendError> {
        Self::for_name(module_path)
    }

    pub fn for_name(name: &str) -> Result<Self, BackendError> {
        let engine = backend::resolve()?;
        Ok(Self::attach(engine, name))
    }

    /// Attach to an explicit engine, bypassing dispatcher lookup.
    pub fn attach(engine: EngineHandle, name: &str) -> Self {
        let sink = Arc::new(CaptureSink::new(CAPTURE_SINK_NAME));

        engine.detach_named(name, CAPTURE_SINK_NAME);
        engine
            .restore_table()
            .snapshot_if_absent(name, || engine.effective_level(name));
        engine.attach(name, Arc::clone(&sink) as Arc<dyn LogSink>, None);
        sink.start();

        #[cfg(feature = "log-bridge")]
        if let Err(e) = crate::bridge::install(name) {
            eprintln!("log-capture: {}", e);
        }

        LogCaptor {
            name: name.to_owned(),
            engine,
            sink,
            closed: AtomicBool::new(false),
        }
    }

    /// Node this captor is attached to; `""` for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Formatted messages of every captured event, in arrival order.
    pub fn logs(&self) -> Vec<String> {
        self.sink
            .snapshot()
            .iter()
            .map(|event| event.message().formatted().to_owned())
            .collect()
    }

    /// Formatted messages of the captured events at exactly `level`.
    pub fn logs_at(&self, level: Level) -> Vec<String> {
        self.sink
            .snapshot()
            .iter()
            .filter(|event| event.level() == level)
            .map(|event| event.message().formatted().to_owned())
            .collect()
    }

    pub fn trace_logs(&self) -> Vec<String> {
        self.logs_at(Level::TRACE)
    }

    pub fn debug_logs(&self) -> Vec<String> {
        self.logs_at(Level::DEBUG)
    }

    pub fn info_logs(&self) -> Vec<String> {
        self.logs_at(Level::INFO)
    }

    pub fn warn_logs(&self) -> Vec<String> {
        self.logs_at(Level::WARN)
    }

    pub fn error_logs(&self) -> Vec<String> {
        self.logs_at(Level::ERROR)
    }

    /// Captured events as [`LogEvent`]s, in arrival order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.sink
            .snapshot()
            .iter()
            .map(|event| mapper::to_log_event(event))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    /// Start `filter` and add it after the sink's existing filters.
    pub fn add_filter<F>(&self, filter: F)
    where
        F: Filter + 'static,
    {
        filter.start();
        self.sink.add_filter(Arc::new(filter));
    }

    pub fn set_level_to_trace(&self) {
        self.set_level(LevelFilter::TRACE);
    }

    pub fn set_level_to_debug(&self) {
        self.set_level(LevelFilter::DEBUG);
    }

    pub fn set_level_to_info(&self) {
        self.set_level(LevelFilter::INFO);
    }

    pub fn set_level_to_warn(&self) {
        self.set_level(LevelFilter::WARN);
    }

    pub fn set_level_to_error(&self) {
        self.set_level(LevelFilter::ERROR);
    }

    /// Suppress every level on the node.
    pub fn disable_logs(&self) {
        self.set_level(LevelFilter::OFF);
    }

    /// Set the node's own level and re-add the engine's console sink to the
    /// node at that threshold. The console is still written once per event:
    /// the engine delivers a shared sink only through its nearest reference.
    /// The change is engine-wide and survives [`close`](LogCaptor::close).
    pub fn set_level(&self, level: LevelFilter) {
        self.engine.detach_named(&self.name, CONSOLE_SINK_NAME);
        if let Some(console) = self.engine.configured_sink(CONSOLE_SINK_NAME) {
            self.engine.attach(&self.name, console, Some(level));
        }
        self.engine.set_level(&self.name, level);
        self.engine.refresh();
    }

    /// Re-apply the level recorded when the first captor for this name was
    /// created. No-op if none was recorded.
    pub fn reset_level(&self) {
        if let Some(level) = self.engine.restore_table().get(&self.name) {
            self.set_level(level);
        }
    }

    /// Drop captured events. The captor stays attached.
    pub fn clear_logs(&self) {
        self.sink.clear();
    }

    /// Stop collecting and detach the sink. Idempotent. Does not restore
    /// the level; see [`reset_level`](LogCaptor::reset_level).
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.sink.stop();
        let sink: Arc<dyn LogSink> = self.sink.clone();
        self.engine.detach(&self.name, &sink);

        #[cfg(feature = "log-bridge")]
        crate::bridge::uninstall(&self.name);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for LogCaptor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LogCaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCaptor")
            .field("name", &self.name)
            .field("captured", &self.sink.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Target of the events logged by the module defining `T`:
/// `app::service::Repo<app::User>` -> `app::service`.
fn type_target<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let is_path = full.starts_with(|c: char| c.is_alphabetic() || c == '_') && !full.starts_with("dyn ");
    if !is_path {
        return full.to_owned();
    }
    let path = match full.find('<') {
        Some(pos) => &full[..pos],
        None => full,
    };
    match path.rfind("::") {
        Some(pos) => path[..pos].to_owned(),
        None => path.to_owned(),
    }
}
