//! `{}`-style logging macros that keep the template and arguments.
//!
//! Events are emitted through `tracing`, so any subscriber sees them as
//! ordinary events; the capture engine additionally records the unformatted
//! template and the rendered arguments.
//!
//! ```ignore
//! use tracing_log_capture::info;
//!
//! info!("Press {} to continue", "Enter");
//! info!(target: "app::keyboard", "Press {} to continue", key);
//! error!(error = err, "Could not save {}", path);
//! ```
//!
//! Arguments are rendered with `Display`, once, and only when the level is
//! enabled for the target. Target and level must be constants, as with
//! `tracing::event!`.

/// Emit a parameterized event at an explicit level.
///
/// `error = value` before the template attaches an error; `value` must be a
/// `'static` type implementing [`std::error::Error`] and is borrowed.
#[macro_export]
macro_rules! log_event {
    (target: $target:expr, $level:expr, error = $err:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        if $crate::__private::tracing::enabled!(target: $target, $level) {
            let __message = $crate::message::Message::parameterized(
                $template,
                ::std::vec![$(::std::string::ToString::to_string(&$arg)),*],
            );
            $crate::message::dispatch(__message, |__text| {
                $crate::__private::tracing::event!(
                    target: $target,
                    $level,
                    error = &$err as &(dyn ::std::error::Error + 'static),
                    "{}",
                    __text
                );
            });
        }
    }};
    (target: $target:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {{
        if $crate::__private::tracing::enabled!(target: $target, $level) {
            let __message = $crate::message::Message::parameterized(
                $template,
                ::std::vec![$(::std::string::ToString::to_string(&$arg)),*],
            );
            $crate::message::dispatch(__message, |__text| {
                $crate::__private::tracing::event!(target: $target, $level, "{}", __text);
            });
        }
    }};
    ($level:expr, error = $err:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_event!(target: ::std::module_path!(), $level, error = $err, $template $(, $arg)*)
    };
    ($level:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $crate::log_event!(target: ::std::module_path!(), $level, $template $(, $arg)*)
    };
}

#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($rest:tt)+) => {
        $crate::log_event!(target: $target, $crate::__private::tracing::Level::TRACE, $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::log_event!($crate::__private::tracing::Level::TRACE, $($rest)+)
    };
}

#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($rest:tt)+) => {
        $crate::log_event!(target: $target, $crate::__private::tracing::Level::DEBUG, $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::log_event!($crate::__private::tracing::Level::DEBUG, $($rest)+)
    };
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($rest:tt)+) => {
        $crate::log_event!(target: $target, $crate::__private::tracing::Level::INFO, $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::log_event!($crate::__private::tracing::Level::INFO, $($rest)+)
    };
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($rest:tt)+) => {
        $crate::log_event!(target: $target, $crate::__private::tracing::Level::WARN, $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::log_event!($crate::__private::tracing::Level::WARN, $($rest)+)
    };
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($rest:tt)+) => {
        $crate::log_event!(target: $target, $crate::__private::tracing::Level::ERROR, $($rest)+)
    };
    ($($rest:tt)+) => {
        $crate::log_event!($crate::__private::tracing::Level::ERROR, $($rest)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::engine::{EngineHandle, ROOT};
    use crate::layer::RoutingLayer;
    use crate::sink::CaptureSink;
    use std::sync::Arc;
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn keeps_template_and_arguments() {
        let engine = EngineHandle::new(LevelFilter::INFO);
        let sink = Arc::new(CaptureSink::new("test"));
        sink.start();
        engine.attach(ROOT, sink.clone(), None);
        let _guard = tracing::subscriber::set_default(Registry::default().with(RoutingLayer::new(engine)));

        let key = "Enter";
        crate::info!("Press {} to continue", key);
        crate::warn!(target: "app::disk", "{} of {} used", 90, "100GB");
        crate::debug!("not enabled {}", key);

        let events = sink.snapshot();
        assert_eq!(events.len(), 2);

        let first = events[0].message();
        assert_eq!(first.template(), "Press {} to continue");
        assert_eq!(first.formatted(), "Press Enter to continue");
        assert_eq!(first.parameters(), ["Enter".to_string()]);
        assert_eq!(events[0].logger_name(), module_path!());

        assert_eq!(events[1].logger_name(), "app::disk");
        assert_eq!(events[1].message().formatted(), "90 of 100GB used");
        assert_eq!(events[1].message().parameters(), ["90".to_string(), "100GB".to_string()]);
    }

    #[derive(Debug)]
    struct DiskFull;

    impl std::fmt::Display for DiskFull {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("disk is full")
        }
    }

    impl std::error::Error for DiskFull {}

    #[test]
    fn attaches_error_next_to_template() {
        let engine = EngineHandle::new(LevelFilter::INFO);
        let sink = Arc::new(CaptureSink::new("test"));
        sink.start();
        engine.attach(ROOT, sink.clone(), None);
        let _guard = tracing::subscriber::set_default(Registry::default().with(RoutingLayer::new(engine)));

        let err = DiskFull;
        crate::error!(error = err, "Could not save {} to {}", "report.pdf", "/tmp");
        crate::error!(target: "app::disk", error = err, "Retry {} failed", 3);

        let events = sink.snapshot();
        assert_eq!(events.len(), 2);

        let record = crate::mapper::to_log_event(&events[0]);
        assert_eq!(record.template(), "Could not save {} to {}");
        assert_eq!(record.formatted_message(), "Could not save report.pdf to /tmp");
        assert_eq!(record.arguments(), ["report.pdf".to_string(), "/tmp".to_string()]);
        assert_eq!(record.error().map(|e| e.message.as_str()), Some("disk is full"));
        assert!(record.fields().is_empty());

        assert_eq!(events[1].logger_name(), "app::disk");
        assert_eq!(events[1].message().template(), "Retry {} failed");
        assert!(events[1].thrown().is_some());
    }
}
