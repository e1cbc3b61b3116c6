use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static CONTEXT: RefCell<BTreeMap<String, String>> = const { RefCell::new(BTreeMap::new()) };
}

/// Thread-local diagnostic context (key/value pairs attached to every
/// event logged on the current thread).
///
/// The routing layer copies the map when an event is captured, so later
/// changes never leak into records that were already taken.
pub struct DiagnosticContext;

impl DiagnosticContext {
    /// Insert or replace `key` for the current thread.
    pub fn put(key: impl Into<String>, value: impl Into<String>) {
        CONTEXT.with(|ctx| {
            ctx.borrow_mut().insert(key.into(), value.into());
        });
    }

    pub fn get(key: &str) -> Option<String> {
        CONTEXT.with(|ctx| ctx.borrow().get(key).cloned())
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(key: &str) -> Option<String> {
        CONTEXT.with(|ctx| ctx.borrow_mut().remove(key))
    }

    pub fn clear() {
        CONTEXT.with(|ctx| ctx.borrow_mut().clear());
    }

    /// Owned copy of the current thread's context.
    pub fn snapshot() -> BTreeMap<String, String> {
        CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn is_empty() -> bool {
        CONTEXT.with(|ctx| ctx.borrow().is_empty())
    }

    /// Put `key` for as long as the returned guard lives.
    ///
    /// On drop the previous value of `key` (if any) is put back.
    pub fn scoped(key: impl Into<String>, value: impl Into<String>) -> ContextGuard {
        let key = key.into();
        let previous = CONTEXT.with(|ctx| ctx.borrow_mut().insert(key.clone(), value.into()));
        ContextGuard { key, previous }
    }
}

/// Guard returned by [`DiagnosticContext::scoped`].
#[must_use = "the context entry is removed when the guard is dropped"]
pub struct ContextGuard {
    key: String,
    previous: Option<String>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let key = std::mem::take(&mut self.key);
        match self.previous.take() {
            Some(previous) => DiagnosticContext::put(key, previous),
            None => {
                DiagnosticContext::remove(&key);
            }
        }
    }
}
