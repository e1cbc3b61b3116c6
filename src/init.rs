use crate::console::{ConsoleSink, CONSOLE_SINK_NAME};
use crate::engine::{EngineHandle, ROOT};
use crate::env::{self, ConfigError, LOG_CAPTURE_CONSOLE_ENV, LOG_CAPTURE_ROOT_LEVEL_ENV};
use crate::layer::RoutingLayer;
use crate::sink::LogSink;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::{DefaultGuard, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the capture engine.
///
/// **Fields**
/// - `root_level`: level of the root node; every target without its own
///   level inherits it.
/// - `console`: if `true`, a [`ConsoleSink`] is registered on the engine
///   and attached to the root, so captured tests still print their logs.
/// - `console_level`: optional threshold for the console on the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub root_level: LevelFilter,
    pub console: bool,
    pub console_level: Option<LevelFilter>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_level: LevelFilter::DEBUG,
            console: true,
            console_level: None,
        }
    }
}

impl EngineConfig {
    /// Read [`LOG_CAPTURE_ROOT_LEVEL_ENV`] and [`LOG_CAPTURE_CONSOLE_ENV`] on
    /// top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(
            &env::env_or(LOG_CAPTURE_ROOT_LEVEL_ENV, "debug"),
            &env::env_or(LOG_CAPTURE_CONSOLE_ENV, "true"),
        )
    }

    /// Parse the values [`from_env`](EngineConfig::from_env) reads.
    pub fn from_values(root_level: &str, console: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            root_level: env::parse_level(LOG_CAPTURE_ROOT_LEVEL_ENV, root_level)?,
            console: env::parse_flag(LOG_CAPTURE_CONSOLE_ENV, console)?,
            console_level: None,
        })
    }

    pub fn with_root_level(mut self, level: LevelFilter) -> Self {
        self.root_level = level;
        self
    }

    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }
}

/// Error returned by [`init_global`] and [`try_init_global`].
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] SetGlobalDefaultError),
    #[error("invalid capture configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Build an engine and a subscriber routing into it, without installing
/// anything.
pub fn build(config: EngineConfig) -> (EngineHandle, impl Subscriber + Send + Sync + 'static) {
    build_with_console(config, ConsoleSink::new())
}

/// Like [`build`], with a caller-provided console sink (for example a
/// [`ConsoleSink::with_writer`] over a buffer). Level overrides look the
/// console up by [`CONSOLE_SINK_NAME`], so the sink should report that name.
pub fn build_with_console<C>(config: EngineConfig, console: C) -> (EngineHandle, impl Subscriber + Send + Sync + 'static)
where
    C: LogSink + 'static,
{
    let engine = EngineHandle::new(config.root_level);
    if config.console {
        let console: Arc<dyn LogSink> = Arc::new(console);
        engine.register_sink(Arc::clone(&console));
        engine.attach(ROOT, console, config.console_level);
    }

    let subscriber = Registry::default().with(RoutingLayer::new(engine.clone()));
    (engine, subscriber)
}

/// Install a new engine as the global default subscriber.
pub fn init_global(config: EngineConfig) -> Result<EngineHandle, InitError> {
    let (engine, subscriber) = build(config);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(engine)
}

static GLOBAL: Mutex<Option<EngineHandle>> = parking_lot::const_mutex(None);

/// Install the global engine once per process, configured from the
/// environment, and return it. Later calls return the same engine.
///
/// Fails if the environment holds an invalid configuration or another
/// subscriber already owns the global slot.
pub fn try_init_global() -> Result<EngineHandle, InitError> {
    let mut global = GLOBAL.lock();
    if let Some(engine) = global.as_ref() {
        return Ok(engine.clone());
    }
    let engine = init_global(EngineConfig::from_env()?)?;
    *global = Some(engine.clone());
    Ok(engine)
}

/// Install a new engine as the default subscriber of the current thread
/// until the guard is dropped.
pub fn init_scoped(config: EngineConfig) -> (EngineHandle, DefaultGuard) {
    let (engine, subscriber) = build(config);
    let guard = tracing::subscriber::set_default(subscriber);
    (engine, guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.root_level, LevelFilter::DEBUG);
        assert!(config.console);
        assert_eq!(config.console_level, None);
    }

    #[test]
    fn env_defaults_parse_to_default_config() {
        assert_eq!(EngineConfig::from_values("debug", "true"), Ok(EngineConfig::default()));
    }

    #[test]
    fn values_override_defaults() {
        let config = EngineConfig::from_values("WARN", "0").unwrap();
        assert_eq!(config.root_level, LevelFilter::WARN);
        assert!(!config.console);

        assert!(matches!(
            EngineConfig::from_values("chatty", "true"),
            Err(ConfigError::InvalidLevel { key: LOG_CAPTURE_ROOT_LEVEL_ENV, .. })
        ));
        assert!(matches!(
            EngineConfig::from_values("info", "sometimes"),
            Err(ConfigError::InvalidFlag { key: LOG_CAPTURE_CONSOLE_ENV, .. })
        ));
    }

    #[test]
    fn build_attaches_console_to_root() {
        let (engine, _subscriber) = build(EngineConfig::default());
        assert_eq!(engine.sink_names(ROOT), vec![CONSOLE_SINK_NAME.to_string()]);
        assert!(engine.configured_sink(CONSOLE_SINK_NAME).is_some());
        assert_eq!(engine.effective_level("any::target"), LevelFilter::DEBUG);
    }

    #[test]
    fn build_without_console() {
        let (engine, _subscriber) = build(EngineConfig::default().without_console());
        assert!(engine.sinks(ROOT).is_empty());
        assert!(engine.configured_sink(CONSOLE_SINK_NAME).is_none());
    }

    #[test]
    fn scoped_engine_is_resolvable() {
        let config = EngineConfig::default().with_root_level(LevelFilter::WARN).without_console();
        let (engine, _guard) = init_scoped(config);
        let resolved = backend::resolve().unwrap();

        resolved.set_level("scoped", LevelFilter::TRACE);
        assert_eq!(engine.own_level("scoped"), Some(LevelFilter::TRACE));
        assert_eq!(engine.effective_level(ROOT), LevelFilter::WARN);
    }
}
