use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

/// Levels of engine nodes as they were before the first override, keyed by
/// node name.
///
/// The first snapshot for a name wins: later attaches never replace it, so
/// restoring always goes back to the level seen before any capture touched
/// the node. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct LevelRestoreTable {
    levels: Arc<Mutex<HashMap<String, LevelFilter>>>,
}

impl LevelRestoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the level produced by `current` unless `name` already has a
    /// snapshot, and return the stored level.
    ///
    /// `current` runs under the table lock, so two racing callers for the
    /// same name cannot both store a value.
    pub fn snapshot_if_absent<F>(&self, name: &str, current: F) -> LevelFilter
    where
        F: FnOnce() -> LevelFilter,
    {
        *self
            .levels
            .lock()
            .entry(name.to_owned())
            .or_insert_with(current)
    }

    pub fn get(&self, name: &str) -> Option<LevelFilter> {
        self.levels.lock().get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.levels.lock().contains_key(name)
    }

    /// Drop the snapshot for `name`; the next attach records a new one.
    pub fn forget(&self, name: &str) -> Option<LevelFilter> {
        self.levels.lock().remove(name)
    }

    /// Drop every snapshot.
    pub fn reset(&self) {
        self.levels.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.levels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn first_writer_wins() {
        let table = LevelRestoreTable::new();
        assert_eq!(table.snapshot_if_absent("app", || LevelFilter::INFO), LevelFilter::INFO);
        assert_eq!(table.snapshot_if_absent("app", || LevelFilter::TRACE), LevelFilter::INFO);
        assert_eq!(table.get("app"), Some(LevelFilter::INFO));
        assert!(table.get("other").is_none());
    }

    #[test]
    fn forget_and_reset() {
        let table = LevelRestoreTable::new();
        table.snapshot_if_absent("a", || LevelFilter::WARN);
        table.snapshot_if_absent("b", || LevelFilter::ERROR);

        assert_eq!(table.forget("a"), Some(LevelFilter::WARN));
        assert!(!table.contains("a"));
        assert_eq!(table.snapshot_if_absent("a", || LevelFilter::DEBUG), LevelFilter::DEBUG);

        table.reset();
        assert!(table.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let table = LevelRestoreTable::new();
        let other = table.clone();
        other.snapshot_if_absent("shared", || LevelFilter::OFF);
        assert_eq!(table.get("shared"), Some(LevelFilter::OFF));
    }

    #[test]
    fn racing_first_snapshots_store_one_value() {
        let table = LevelRestoreTable::new();
        let barrier = Arc::new(Barrier::new(8));
        let levels = [
            LevelFilter::TRACE,
            LevelFilter::DEBUG,
            LevelFilter::INFO,
            LevelFilter::WARN,
        ];

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = table.clone();
                let barrier = Arc::clone(&barrier);
                let level = levels[i % levels.len()];
                thread::spawn(move || {
                    barrier.wait();
                    table.snapshot_if_absent("race", || level)
                })
            })
            .collect();

        let results: Vec<LevelFilter> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stored = table.get("race").unwrap();
        assert!(results.iter().all(|level| *level == stored));
    }
}
