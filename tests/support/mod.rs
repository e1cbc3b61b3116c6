//! Small services that log through the different facades.

#![allow(dead_code)]

use std::fmt;

/// Logs through `tracing` macros.
#[derive(Default)]
pub struct FooService;

impl FooService {
    pub fn say_hello(&self) {
        tracing::info!("Keyboard not responding. Press any key to continue...");
        tracing::warn!("Congratulations, you are pregnant!");
    }

    pub fn log_every_level(&self) {
        tracing::trace!("level trace");
        tracing::debug!("level debug");
        tracing::info!("level info");
        tracing::warn!("level warn");
        tracing::error!("level error");
    }
}

/// Logs `{}` templates through the crate macros.
#[derive(Default)]
pub struct KeyboardService;

impl KeyboardService {
    pub fn prompt(&self, key: &str) {
        tracing_log_capture::info!("Press {} to continue", key);
    }
}

/// Logs through the `log` facade.
#[derive(Default)]
pub struct LegacyService;

impl LegacyService {
    pub fn process(&self, id: u32) {
        log::info!("processing order {}", id);
        if id == 0 {
            log::error!("order id must not be zero");
        }
    }
}

/// Logs with a request id in the diagnostic context.
#[derive(Default)]
pub struct RequestService;

impl RequestService {
    pub fn handle(&self, request_id: &str) {
        let _ctx = tracing_log_capture::DiagnosticContext::scoped("req-id", request_id);
        tracing::info!("Processing request");
    }

    pub fn handle_without_context(&self) {
        tracing::info!("Processing anonymous request");
    }
}

#[derive(Debug)]
pub struct DiskFull;

impl fmt::Display for DiskFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("disk is full")
    }
}

impl std::error::Error for DiskFull {}

/// Logs an error value.
#[derive(Default)]
pub struct StorageService;

impl StorageService {
    pub fn save(&self) {
        let err = DiskFull;
        tracing::error!(error = &err as &(dyn std::error::Error + 'static), "Could not save document");
    }

    pub fn save_as(&self, name: &str, attempt: u32) {
        let err = DiskFull;
        tracing_log_capture::error!(error = err, "Could not save {} (attempt {})", name, attempt);
    }
}
