use crate::engine::EngineHandle;
use crate::layer::RoutingLayer;
use std::any::type_name;
use tracing::subscriber::NoSubscriber;
use tracing::Dispatch;
use tracing_subscriber::Registry;

/// Error returned when the active `tracing` dispatcher cannot be captured.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error(
        "tracing subscriber should contain the layer [{expected}] but found [{found}]. \
         Please remove any other subscriber installation from the test setup, or install \
         the capture engine with `init::try_init_global` or `init::init_scoped`"
    )]
    Unsupported {
        expected: &'static str,
        found: &'static str,
    },
}

/// Find the capture engine behind the dispatcher that is current on this
/// thread (the thread-local default if set, the global one otherwise).
pub fn resolve() -> Result<EngineHandle, BackendError> {
    tracing::dispatcher::get_default(resolve_from)
}

/// Find the capture engine behind `dispatch`.
pub fn resolve_from(dispatch: &Dispatch) -> Result<EngineHandle, BackendError> {
    match dispatch.downcast_ref::<RoutingLayer>() {
        Some(layer) => Ok(layer.engine().clone()),
        None => Err(BackendError::Unsupported {
            expected: type_name::<RoutingLayer>(),
            found: describe(dispatch),
        }),
    }
}

/// Best-effort name of the subscriber behind `dispatch`. A `Dispatch` only
/// exposes downcasting, so only well-known subscriber types can be named.
fn describe(dispatch: &Dispatch) -> &'static str {
    if dispatch.is::<NoSubscriber>() {
        type_name::<NoSubscriber>()
    } else if dispatch.is::<tracing_subscriber::fmt::Subscriber>() {
        type_name::<tracing_subscriber::fmt::Subscriber>()
    } else if dispatch.is::<Registry>() {
        type_name::<Registry>()
    } else {
        "an unrecognized tracing subscriber"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn resolves_routing_layer() {
        let engine = EngineHandle::new(LevelFilter::INFO);
        let dispatch = Dispatch::new(Registry::default().with(RoutingLayer::new(engine.clone())));

        let resolved = resolve_from(&dispatch).unwrap();
        resolved.set_level("shared::node", LevelFilter::TRACE);
        assert_eq!(engine.own_level("shared::node"), Some(LevelFilter::TRACE));
    }

    #[test]
    fn rejects_fmt_subscriber() {
        let dispatch = Dispatch::new(tracing_subscriber::fmt().finish());
        let err = resolve_from(&dispatch).unwrap_err();

        let BackendError::Unsupported { expected, found } = &err;
        assert!(expected.ends_with("RoutingLayer"));
        assert!(found.starts_with("tracing_subscriber::fmt"));
        assert!(err.to_string().contains("Please remove any other subscriber"));
    }

    #[test]
    fn rejects_missing_subscriber() {
        let err = resolve_from(&Dispatch::none()).unwrap_err();
        let BackendError::Unsupported { found, .. } = err;
        assert!(found.ends_with("NoSubscriber"));
    }

    #[test]
    fn resolves_thread_default() {
        let engine = EngineHandle::new(LevelFilter::INFO);
        let subscriber = Registry::default().with(RoutingLayer::new(engine));
        let resolved = tracing::subscriber::with_default(subscriber, resolve);
        assert!(resolved.is_ok());
    }
}
