use crate::event::NativeEvent;
use crate::filter::{self, Filter, FilterResult};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Destination for [`NativeEvent`]s routed by the engine.
///
/// The engine calls [`filter`](LogSink::filter) and
/// [`is_started`](LogSink::is_started) first and only calls
/// [`append`](LogSink::append) when the sink is started and the filter does
/// not deny the event. `append` runs on whatever thread emitted the event.
pub trait LogSink: Send + Sync {
    /// Name used to find and replace the sink on an engine node.
    fn name(&self) -> &str;

    fn append(&self, event: &Arc<NativeEvent>);

    fn filter(&self, _event: &NativeEvent) -> FilterResult {
        FilterResult::Neutral
    }

    fn is_started(&self) -> bool {
        true
    }
}

/// In-memory, append-only sink used by [`LogCaptor`](crate::captor::LogCaptor).
///
/// All events live behind one mutex, so an append is either fully visible
/// to [`snapshot`](CaptureSink::snapshot) or not at all, and
/// [`clear`](CaptureSink::clear) only drops events appended before it.
pub struct CaptureSink {
    name: String,
    events: Mutex<Vec<Arc<NativeEvent>>>,
    filters: RwLock<Vec<Arc<dyn Filter>>>,
    started: AtomicBool,
}

impl CaptureSink {
    /// New, stopped sink.
    pub fn new(name: impl Into<String>) -> Self {
        CaptureSink {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::Release);
    }

    /// Add a filter after the existing ones. Filters cannot be removed.
    pub fn add_filter(&self, filter: Arc<dyn Filter>) {
        self.filters.write().push(filter);
    }

    /// Captured events in append order.
    pub fn snapshot(&self) -> Vec<Arc<NativeEvent>> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl LogSink for CaptureSink {
    fn name(&self) -> &str {
        &self.name
    }

    /// Events are stamped before routing, so two threads can append in the
    /// opposite order of their stamps. The capture time is clamped to the
    /// last appended one to keep timestamps non-decreasing in capture order.
    fn append(&self, event: &Arc<NativeEvent>) {
        let mut events = self.events.lock();
        let floor = events.last().map(|last| last.time_millis());
        match floor {
            Some(floor) if floor > event.time_millis() => {
                let clamped = event.as_ref().clone().with_time_millis(floor);
                events.push(Arc::new(clamped));
            }
            _ => events.push(Arc::clone(event)),
        }
    }

    fn filter(&self, event: &NativeEvent) -> FilterResult {
        filter::evaluate(&self.filters.read(), event)
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}
