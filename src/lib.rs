//! In-memory capture of `tracing` (and `log`) events for tests.
//!
//! Install the capture engine, attach a [`LogCaptor`] to a target, run the
//! code under test and assert on what it logged:
//!
//! ```ignore
//! let (_engine, _guard) = tracing_log_capture::init::init_scoped(Default::default());
//! let captor = tracing_log_capture::LogCaptor::for_module("my_app::service")?;
//!
//! my_app::service::start();
//!
//! assert_eq!(captor.info_logs(), vec!["Started"]);
//! ```

pub mod backend;
#[cfg(feature = "log-bridge")]
pub mod bridge;
pub mod captor;
pub mod console;
pub mod context;
pub mod engine;
pub mod env;
pub mod event;
pub mod filter;
pub mod init;
pub mod layer;
pub mod levels;
pub mod mapper;
pub mod message;
pub mod record;
pub mod sink;

mod macros;

pub use backend::BackendError;
pub use captor::LogCaptor;
pub use context::DiagnosticContext;
pub use engine::EngineHandle;
pub use filter::{Filter, FilterResult, LevelMatchFilter, PredicateFilter, ThresholdFilter};
pub use init::EngineConfig;
pub use record::{ErrorInfo, LogEvent};

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
