use indexmap::{IndexMap, IndexSet};

/// Evaluation context for dependency discovery.
///
/// Each in-flight computed evaluation pushes a frame; property reads are
/// recorded on the innermost frame only. Re-entrant evaluation therefore
/// attributes nested reads to the innermost evaluating property, and the
/// outer frame resumes unchanged when the inner one is popped.
pub(crate) struct TrackingContext {
    stack: Vec<Frame>,
}

struct Frame {
    prop: String,
    accessed: IndexSet<String>,
}

impl TrackingContext {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Name of the innermost evaluating property, if any.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(|frame| frame.prop.as_str())
    }

    /// Record that the innermost evaluating property read `prop`. No-op
    /// outside an evaluation.
    pub fn record_access(&mut self, prop: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.accessed.insert(prop.to_string());
        }
    }

    pub fn push(&mut self, prop: &str) {
        self.stack.push(Frame {
            prop: prop.to_string(),
            accessed: IndexSet::new(),
        });
    }

    /// Pop the innermost frame, returning the set of properties it read.
    pub fn pop(&mut self) -> IndexSet<String> {
        self.stack
            .pop()
            .map(|frame| frame.accessed)
            .unwrap_or_default()
    }
}

/// The property dependency graph: directed edges from a property to every
/// computed property whose last completed evaluation read it.
///
/// Edges are replaced wholesale after each evaluation of a dependent, so
/// stale edges are pruned rather than accumulated, and the graph always
/// reflects only the most recent evaluation.
pub(crate) struct DependencyGraph {
    dependents: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            dependents: IndexMap::new(),
        }
    }

    /// Ensure a node exists for `prop`.
    pub fn register(&mut self, prop: &str) {
        self.dependents.entry(prop.to_string()).or_default();
    }

    /// Computed properties that depend on `prop`, in the order the edges
    /// were recorded.
    pub fn dependents_of(&self, prop: &str) -> Vec<String> {
        self.dependents
            .get(prop)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Swap `dependent`'s edges: drop the edge from every property in `old`
    /// and record one from every property in `new`.
    pub fn replace_dependencies(
        &mut self,
        dependent: &str,
        old: &[String],
        new: &IndexSet<String>,
    ) {
        for obsolete in old {
            if let Some(set) = self.dependents.get_mut(obsolete) {
                set.shift_remove(dependent);
            }
        }
        for prop in new {
            self.dependents
                .entry(prop.clone())
                .or_default()
                .insert(dependent.to_string());
        }
    }
}
