use crate::event::NativeEvent;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Outcome of a [`Filter`] decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Deliver the event without consulting later filters.
    Accept,
    /// No opinion; the next filter decides.
    Neutral,
    /// Drop the event.
    Deny,
}

/// Decides whether a sink receives an event. Evaluated by the engine before
/// [`LogSink::append`](crate::sink::LogSink::append) is called.
pub trait Filter: Send + Sync {
    fn filter(&self, event: &NativeEvent) -> FilterResult;

    /// Called once when the filter is installed on a sink.
    fn start(&self) {}
}

/// Matches one exact level.
///
/// With `on_mismatch(FilterResult::Deny)` a sink only receives events of
/// that level.
#[derive(Debug, Clone, Copy)]
pub struct LevelMatchFilter {
    level: Level,
    on_match: FilterResult,
    on_mismatch: FilterResult,
}

impl LevelMatchFilter {
    pub fn new(level: Level) -> Self {
        LevelMatchFilter {
            level,
            on_match: FilterResult::Neutral,
            on_mismatch: FilterResult::Deny,
        }
    }

    pub fn on_match(mut self, result: FilterResult) -> Self {
        self.on_match = result;
        self
    }

    pub fn on_mismatch(mut self, result: FilterResult) -> Self {
        self.on_mismatch = result;
        self
    }
}

impl Filter for LevelMatchFilter {
    fn filter(&self, event: &NativeEvent) -> FilterResult {
        if event.level() == self.level {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

/// Matches events at least as severe as `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdFilter {
    threshold: LevelFilter,
    on_match: FilterResult,
    on_mismatch: FilterResult,
}

impl ThresholdFilter {
    pub fn new(threshold: LevelFilter) -> Self {
        ThresholdFilter {
            threshold,
            on_match: FilterResult::Neutral,
            on_mismatch: FilterResult::Deny,
        }
    }

    pub fn on_match(mut self, result: FilterResult) -> Self {
        self.on_match = result;
        self
    }

    pub fn on_mismatch(mut self, result: FilterResult) -> Self {
        self.on_mismatch = result;
        self
    }
}

impl Filter for ThresholdFilter {
    fn filter(&self, event: &NativeEvent) -> FilterResult {
        if event.level() <= self.threshold {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

/// Boolean predicate: `true` is neutral, `false` denies.
pub struct PredicateFilter<F> {
    predicate: F,
}

impl<F> PredicateFilter<F>
where
    F: Fn(&NativeEvent) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        PredicateFilter { predicate }
    }
}

impl<F> Filter for PredicateFilter<F>
where
    F: Fn(&NativeEvent) -> bool + Send + Sync,
{
    fn filter(&self, event: &NativeEvent) -> FilterResult {
        if (self.predicate)(event) {
            FilterResult::Neutral
        } else {
            FilterResult::Deny
        }
    }
}

/// Evaluate `filters` in order: the first `Accept` or `Deny` wins.
pub fn evaluate(filters: &[Arc<dyn Filter>], event: &NativeEvent) -> FilterResult {
    for filter in filters {
        match filter.filter(event) {
            FilterResult::Neutral => continue,
            decided => return decided,
        }
    }
    FilterResult::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn event(level: Level) -> NativeEvent {
        NativeEvent::new(level, "app", Message::simple("m"))
    }

    #[test]
    fn level_match_denies_other_levels() {
        let filter = LevelMatchFilter::new(Level::INFO).on_mismatch(FilterResult::Deny);
        assert_eq!(filter.filter(&event(Level::INFO)), FilterResult::Neutral);
        assert_eq!(filter.filter(&event(Level::WARN)), FilterResult::Deny);
        assert_eq!(filter.filter(&event(Level::TRACE)), FilterResult::Deny);
    }

    #[test]
    fn threshold_admits_more_severe_levels() {
        let filter = ThresholdFilter::new(LevelFilter::WARN);
        assert_eq!(filter.filter(&event(Level::ERROR)), FilterResult::Neutral);
        assert_eq!(filter.filter(&event(Level::WARN)), FilterResult::Neutral);
        assert_eq!(filter.filter(&event(Level::INFO)), FilterResult::Deny);
    }

    #[test]
    fn predicate_maps_bool() {
        let filter = PredicateFilter::new(|e: &NativeEvent| e.message().formatted() == "m");
        assert_eq!(filter.filter(&event(Level::INFO)), FilterResult::Neutral);

        let filter = PredicateFilter::new(|e: &NativeEvent| e.logger_name() == "other");
        assert_eq!(filter.filter(&event(Level::INFO)), FilterResult::Deny);
    }

    #[test]
    fn first_decision_wins() {
        let accept_errors: Arc<dyn Filter> = Arc::new(
            LevelMatchFilter::new(Level::ERROR)
                .on_match(FilterResult::Accept)
                .on_mismatch(FilterResult::Neutral),
        );
        let deny_all: Arc<dyn Filter> = Arc::new(PredicateFilter::new(|_: &NativeEvent| false));
        let filters = vec![accept_errors, deny_all];

        assert_eq!(evaluate(&filters, &event(Level::ERROR)), FilterResult::Accept);
        assert_eq!(evaluate(&filters, &event(Level::INFO)), FilterResult::Deny);
        assert_eq!(evaluate(&[], &event(Level::INFO)), FilterResult::Neutral);
    }
}
