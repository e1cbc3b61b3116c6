use crate::event::NativeEvent;
use crate::filter::FilterResult;
use crate::levels::LevelRestoreTable;
use crate::sink::LogSink;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Name of the root node. Every other name is a `::`-separated path below it.
pub const ROOT: &str = "";

const SEPARATOR: &str = "::";

struct SinkRef {
    sink: Arc<dyn LogSink>,
    /// Least severe level this reference passes on; `None` passes all.
    threshold: Option<LevelFilter>,
}

struct Node {
    /// `None` inherits the closest ancestor's level.
    level: Option<LevelFilter>,
    sinks: Vec<SinkRef>,
    additive: bool,
}

impl Node {
    fn new(level: Option<LevelFilter>) -> Self {
        Node {
            level,
            sinks: Vec::new(),
            additive: true,
        }
    }
}

struct EngineState {
    nodes: RwLock<HashMap<String, Node>>,
    configured: RwLock<HashMap<String, Arc<dyn LogSink>>>,
    restore: LevelRestoreTable,
}

/// Shared handle to the routing tree.
///
/// Nodes are keyed by target name (`my_crate::service`). An event for a
/// target is admitted when its level passes the effective level of the
/// closest configured node, and is then delivered to the sinks of that node
/// and of every ancestor up to the root, until a non-additive node is
/// reached.
///
/// Nodes spring into existence when a sink or level is set on them. Clones
/// share the same tree.
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<EngineState>,
}

impl EngineHandle {
    pub fn new(root_level: LevelFilter) -> Self {
        Self::with_restore_table(root_level, LevelRestoreTable::new())
    }

    /// Build an engine that snapshots original levels into `restore`.
    pub fn with_restore_table(root_level: LevelFilter, restore: LevelRestoreTable) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT.to_owned(), Node::new(Some(root_level)));

        EngineHandle {
            state: Arc::new(EngineState {
                nodes: RwLock::new(nodes),
                configured: RwLock::new(HashMap::new()),
                restore,
            }),
        }
    }

    /// `a::b::c` -> `a::b` -> `a` -> root -> `None`.
    pub fn parent_of(name: &str) -> Option<&str> {
        if name == ROOT {
            return None;
        }
        match name.rfind(SEPARATOR) {
            Some(pos) => Some(&name[..pos]),
            None => Some(ROOT),
        }
    }

    /// Whether `name` is `ancestor` or lies below it.
    pub fn is_descendant(name: &str, ancestor: &str) -> bool {
        if ancestor == ROOT || name == ancestor {
            return true;
        }
        name.strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    pub fn restore_table(&self) -> &LevelRestoreTable {
        &self.state.restore
    }

    /// Level of the closest node on the path to the root that has one.
    pub fn effective_level(&self, name: &str) -> LevelFilter {
        let nodes = self.state.nodes.read();
        effective_level_in(&nodes, name)
    }

    /// The node's own level, `None` when it inherits.
    pub fn own_level(&self, name: &str) -> Option<LevelFilter> {
        self.state.nodes.read().get(name).and_then(|node| node.level)
    }

    pub fn set_level(&self, name: &str, level: LevelFilter) {
        self.with_node(name, |node| node.level = Some(level));
    }

    /// Make the node inherit again. The root always keeps its level.
    pub fn clear_level(&self, name: &str) {
        if name == ROOT {
            return;
        }
        if let Some(node) = self.state.nodes.write().get_mut(name) {
            node.level = None;
        }
    }

    /// When `false`, events stop at this node instead of also reaching the
    /// sinks of its ancestors.
    pub fn set_additive(&self, name: &str, additive: bool) {
        self.with_node(name, |node| node.additive = additive);
    }

    pub fn is_enabled(&self, target: &str, level: Level) -> bool {
        level <= self.effective_level(target)
    }

    /// Attach `sink` to the node. `threshold` further limits which levels
    /// the reference passes on.
    pub fn attach(&self, name: &str, sink: Arc<dyn LogSink>, threshold: Option<LevelFilter>) {
        self.with_node(name, |node| node.sinks.push(SinkRef { sink, threshold }));
    }

    /// Remove every sink called `sink_name` from the node.
    pub fn detach_named(&self, name: &str, sink_name: &str) -> Vec<Arc<dyn LogSink>> {
        let mut nodes = self.state.nodes.write();
        let Some(node) = nodes.get_mut(name) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        node.sinks.retain(|r| {
            if r.sink.name() == sink_name {
                removed.push(Arc::clone(&r.sink));
                false
            } else {
                true
            }
        });
        removed
    }

    /// Remove this exact sink instance from the node. Returns whether it was
    /// attached.
    pub fn detach(&self, name: &str, sink: &Arc<dyn LogSink>) -> bool {
        let target = sink_id(sink);
        let mut nodes = self.state.nodes.write();
        let Some(node) = nodes.get_mut(name) else {
            return false;
        };

        let before = node.sinks.len();
        node.sinks.retain(|r| sink_id(&r.sink) != target);
        node.sinks.len() != before
    }

    /// Sinks attached directly to the node, in attach order.
    pub fn sinks(&self, name: &str) -> Vec<Arc<dyn LogSink>> {
        self.state
            .nodes
            .read()
            .get(name)
            .map(|node| node.sinks.iter().map(|r| Arc::clone(&r.sink)).collect())
            .unwrap_or_default()
    }

    pub fn sink_names(&self, name: &str) -> Vec<String> {
        self.sinks(name)
            .iter()
            .map(|sink| sink.name().to_owned())
            .collect()
    }

    /// Make `sink` available by name to code that rewires nodes, such as
    /// level overrides re-adding the console sink.
    pub fn register_sink(&self, sink: Arc<dyn LogSink>) {
        self.state
            .configured
            .write()
            .insert(sink.name().to_owned(), sink);
    }

    pub fn configured_sink(&self, name: &str) -> Option<Arc<dyn LogSink>> {
        self.state.configured.read().get(name).cloned()
    }

    /// Deliver `event` to every sink it reaches. Returns the number of sinks
    /// that appended it.
    pub fn route(&self, event: &Arc<NativeEvent>) -> usize {
        let targets = {
            let nodes = self.state.nodes.read();
            let level = event.level();
            if level > effective_level_in(&nodes, event.logger_name()) {
                return 0;
            }

            // A sink referenced from several nodes is decided once, by the
            // reference closest to the event's node.
            let mut seen: HashSet<*const ()> = HashSet::new();
            let mut targets = Vec::new();
            for name in ancestry(event.logger_name()) {
                let Some(node) = nodes.get(name) else {
                    continue;
                };
                for r in &node.sinks {
                    if !seen.insert(sink_id(&r.sink)) {
                        continue;
                    }
                    if r.threshold.map_or(true, |t| level <= t) {
                        targets.push(Arc::clone(&r.sink));
                    }
                }
                if !node.additive {
                    break;
                }
            }
            targets
        };

        // Sinks run outside the tree lock so they may log or rewire nodes.
        let mut delivered = 0;
        for sink in targets {
            if sink.is_started() && sink.filter(event) != FilterResult::Deny {
                sink.append(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Re-evaluate cached callsite interest after a level change.
    pub fn refresh(&self) {
        tracing::callsite::rebuild_interest_cache();
    }

    fn with_node<F>(&self, name: &str, f: F)
    where
        F: FnOnce(&mut Node),
    {
        let mut nodes = self.state.nodes.write();
        let node = nodes
            .entry(name.to_owned())
            .or_insert_with(|| Node::new(None));
        f(node);
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.state.nodes.read();
        let mut names: Vec<&String> = nodes.keys().collect();
        names.sort();
        f.debug_struct("EngineHandle")
            .field("nodes", &names)
            .finish()
    }
}

/// Identity of a sink instance, ignoring the vtable half of the pointer.
fn sink_id(sink: &Arc<dyn LogSink>) -> *const () {
    Arc::as_ptr(sink) as *const ()
}

fn ancestry(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |current| EngineHandle::parent_of(*current))
}

fn effective_level_in(nodes: &HashMap<String, Node>, name: &str) -> LevelFilter {
    ancestry(name)
        .find_map(|current| nodes.get(current).and_then(|node| node.level))
        .unwrap_or(LevelFilter::OFF)
}
