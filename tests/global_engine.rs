//! Runs in its own binary: installs the process-wide subscriber.

use tracing::level_filters::LevelFilter;
use tracing_log_capture::init;
use tracing_log_capture::LogCaptor;

#[test]
fn global_engine_captures_every_thread() {
    let engine = init::try_init_global().unwrap();
    let again = init::try_init_global().unwrap();
    again.set_level("global_engine::shared", LevelFilter::TRACE);
    assert_eq!(engine.own_level("global_engine::shared"), Some(LevelFilter::TRACE));

    let captor = LogCaptor::for_root().unwrap();

    std::thread::spawn(|| {
        tracing::info!(target: "global_engine::worker", "from a worker");
        log::warn!(target: "global_engine::legacy", "from the log facade");
    })
    .join()
    .unwrap();

    let events = captor.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].logger_name(), Some("global_engine::worker"));
    assert_eq!(events[1].formatted_message(), "from the log facade");
    assert_eq!(captor.warn_logs(), vec!["from the log facade"]);

    assert!(matches!(
        init::init_global(Default::default()),
        Err(init::InitError::AlreadyInstalled(_))
    ));
}
