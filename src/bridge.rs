//! Bridge from the `log` crate into the capture engine.
//!
//! `log` has one process-wide logger slot. The bridge claims it once and then
//! forwards records whose target lies below a bridged name, re-emitting them
//! as `tracing` events with [`tracing_log::format_trace`]. Names are reference
//! counted so every captor can install and uninstall independently.

use crate::engine::EngineHandle;
use log::{Log, Metadata, Record};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Error returned when the `log` facade is owned by another logger.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    #[error("another `log` logger is already installed; `log` records will not be captured")]
    ForeignLogger,
}

#[derive(Default)]
struct LogBridge {
    bridged: RwLock<HashMap<String, usize>>,
}

impl LogBridge {
    fn covers(&self, target: &str) -> bool {
        self.bridged
            .read()
            .keys()
            .any(|name| EngineHandle::is_descendant(target, name))
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.covers(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Err(e) = tracing_log::format_trace(record) {
            eprintln!("log bridge failed to forward record: {}", e);
        }
    }

    fn flush(&self) {}
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();
static INSTALLED: OnceLock<bool> = OnceLock::new();

fn bridge() -> &'static LogBridge {
    BRIDGE.get_or_init(LogBridge::default)
}

/// Claim the `log` logger slot (once per process) and forward records below
/// `name`. Calling it again for the same name adds a reference.
pub fn install(name: &str) -> Result<(), BridgeError> {
    let bridge = bridge();
    let installed = *INSTALLED.get_or_init(|| match log::set_logger(bridge) {
        Ok(()) => {
            log::set_max_level(log::LevelFilter::Trace);
            true
        }
        Err(_) => false,
    });

    *bridge.bridged.write().entry(name.to_owned()).or_insert(0) += 1;

    if installed {
        Ok(())
    } else {
        Err(BridgeError::ForeignLogger)
    }
}

/// Drop one reference for `name`. Records stop being forwarded once the
/// last reference is gone; unknown names are ignored.
pub fn uninstall(name: &str) {
    let mut bridged = bridge().bridged.write();
    if let Some(count) = bridged.get_mut(name) {
        *count -= 1;
        if *count == 0 {
            bridged.remove(name);
        }
    }
}

/// Whether `log` records for `target` are currently forwarded.
pub fn is_bridged(target: &str) -> bool {
    bridge().covers(target)
}
