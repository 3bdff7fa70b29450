use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::reaction::{reactify, NotifyFn};
use crate::runtime::{DependencyGraph, TrackingContext};
use crate::value::Value;

/// A computed property definition. The function receives the store handle
/// as its single argument; every property read through it is tracked.
pub type ComputedFn = Rc<dyn Fn(&Store) -> Value>;

type Listener = Rc<dyn Fn(&Value, &Value)>;

enum PropState {
    Static {
        current: Value,
    },
    Computed {
        compute: ComputedFn,
        cached: Option<Value>,
        /// Last known value, populated only between invalidation and
        /// re-evaluation; never present together with `cached`.
        outdated: Option<Value>,
        /// Properties read by the last completed evaluation.
        dependencies: Vec<String>,
    },
}

struct StoreInner {
    props: RefCell<IndexMap<String, PropState>>,
    graph: RefCell<DependencyGraph>,
    tracking: RefCell<TrackingContext>,
    watchers: RefCell<IndexMap<String, Vec<(usize, Listener)>>>,
    next_watcher_id: Cell<usize>,
    verbose: bool,
}

/// A reactive state container.
///
/// A store is declared as a set of named properties, each either *static*
/// (a plain value, changed only by explicit writes) or *computed* (derived
/// by a function whose property reads are discovered automatically). Reads
/// of computed properties are lazy and memoized: the function runs only on
/// first read and after a transitively-read dependency changed.
///
/// Structured values are wrapped recursively on the way in, so mutations at
/// any depth of a nested container invalidate the owning property.
///
/// The handle is cheap to clone and single-threaded; all propagation is
/// synchronous and completes within the triggering call.
///
/// # Examples
///
/// ```
/// use canister::{Store, Value};
///
/// let store = Store::builder()
///     .value("a", 1)
///     .value("b", 2)
///     .computed("c", |s| {
///         Value::from(s.get("a").as_i64().unwrap() + s.get("b").as_i64().unwrap())
///     })
///     .build();
///
/// assert_eq!(store.get("c"), Value::Int(3));
/// store.set("a", 4);
/// assert_eq!(store.get("c"), Value::Int(6));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

/// Declares the properties of a [`Store`].
pub struct StoreBuilder {
    decls: Vec<(String, Decl)>,
    verbose: bool,
}

enum Decl {
    Static(Value),
    Computed(ComputedFn),
}

impl StoreBuilder {
    /// Declare a static property.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.decls.push((name.into(), Decl::Static(value.into())));
        self
    }

    /// Declare a computed property.
    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Store) -> Value + 'static,
    {
        self.decls
            .push((name.into(), Decl::Computed(Rc::new(compute))));
        self
    }

    /// Emit a `tracing` event for every access, invalidation and
    /// re-evaluation. Purely observational; has no effect on values or
    /// notification timing.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the store. Computed properties are not evaluated here; no work
    /// happens until the first read.
    pub fn build(self) -> Store {
        let store = Store {
            inner: Rc::new(StoreInner {
                props: RefCell::new(IndexMap::new()),
                graph: RefCell::new(DependencyGraph::new()),
                tracking: RefCell::new(TrackingContext::new()),
                watchers: RefCell::new(IndexMap::new()),
                next_watcher_id: Cell::new(0),
                verbose: self.verbose,
            }),
        };

        for (name, decl) in self.decls {
            match decl {
                Decl::Static(value) => {
                    if store.inner.verbose {
                        debug!(prop = name.as_str(), "define static property");
                    }
                    store.define_static(&name, value);
                }
                Decl::Computed(compute) => {
                    if store.inner.verbose {
                        debug!(prop = name.as_str(), "define computed property");
                    }
                    store.inner.props.borrow_mut().insert(
                        name.clone(),
                        PropState::Computed {
                            compute,
                            cached: None,
                            outdated: None,
                            dependencies: Vec::new(),
                        },
                    );
                    store.inner.graph.borrow_mut().register(&name);
                }
            }
        }

        store
    }
}

enum ReadPlan {
    Static(Value),
    Cached(Value),
    Evaluate {
        compute: ComputedFn,
        outdated: Option<Value>,
    },
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder {
            decls: Vec::new(),
            verbose: false,
        }
    }

    /// Names of all declared properties, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.props.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, prop: &str) -> bool {
        self.inner.props.borrow().contains_key(prop)
    }

    /// Read a property.
    ///
    /// Static properties return their current (wrapped) value. Computed
    /// properties return the memoized value when present; otherwise the
    /// function is evaluated inside a fresh tracking frame, its dependency
    /// edges are replaced with the freshly observed set, the result is
    /// memoized, and watchers are fired if an outdated value was pending and
    /// differs from the fresh one.
    ///
    /// When called during another computed evaluation, the read is recorded
    /// as a dependency of the innermost evaluating property. Reading an
    /// undeclared name yields `Null` and records nothing.
    pub fn get(&self, prop: &str) -> Value {
        let plan = {
            let props = self.inner.props.borrow();
            match props.get(prop) {
                None => return Value::Null,
                Some(PropState::Static { current }) => ReadPlan::Static(current.clone()),
                Some(PropState::Computed {
                    compute,
                    cached,
                    outdated,
                    ..
                }) => match cached {
                    Some(value) => ReadPlan::Cached(value.clone()),
                    None => ReadPlan::Evaluate {
                        compute: Rc::clone(compute),
                        outdated: outdated.clone(),
                    },
                },
            }
        };

        {
            let mut tracking = self.inner.tracking.borrow_mut();
            if self.inner.verbose {
                if let Some(current) = tracking.current() {
                    debug!(prop, tracked_by = current, "accessed while tracking");
                } else {
                    debug!(prop, "accessed property");
                }
            }
            tracking.record_access(prop);
        }

        match plan {
            ReadPlan::Static(value) => value,
            ReadPlan::Cached(value) => {
                if self.inner.verbose {
                    debug!(prop, "returning cached value");
                }
                value
            }
            ReadPlan::Evaluate { compute, outdated } => self.evaluate(prop, compute, outdated),
        }
    }

    /// Write a static property.
    ///
    /// A write of a value identical to the current one is a no-op. Otherwise
    /// the value is wrapped, every dependent computed property is invalidated
    /// depth-first, and this property's watchers fire with `(new, old)` in
    /// registration order, all before this call returns.
    ///
    /// Writes to computed properties are ignored. Writing an undeclared name
    /// defines a new static property.
    pub fn set(&self, prop: &str, value: impl Into<Value>) {
        let value = value.into();

        enum Target {
            Missing,
            Computed,
            Static(Value),
        }

        let target = {
            let props = self.inner.props.borrow();
            match props.get(prop) {
                None => Target::Missing,
                Some(PropState::Computed { .. }) => Target::Computed,
                Some(PropState::Static { current }) => Target::Static(current.clone()),
            }
        };

        match target {
            Target::Missing => {
                if self.inner.verbose {
                    debug!(prop, "define static property at runtime");
                }
                self.define_static(prop, value);
            }
            Target::Computed => {
                if self.inner.verbose {
                    debug!(prop, "ignoring write to computed property");
                }
            }
            Target::Static(old) => {
                if value.identity_eq(&old) {
                    return;
                }

                let wrapped = self.wrap_for(prop, value);
                {
                    let mut props = self.inner.props.borrow_mut();
                    if let Some(PropState::Static { current }) = props.get_mut(prop) {
                        *current = wrapped.clone();
                    }
                }

                if self.inner.verbose {
                    debug!(prop, value = %wrapped, "set static property");
                }

                for dependent in self.dependents_of(prop) {
                    self.invalidate(&dependent);
                }
                self.notify_watchers(prop, &wrapped, &old);
            }
        }
    }

    /// Register a listener for a property.
    ///
    /// The first listener for a property forces one baseline read, so future
    /// invalidations have a value to compare against. Listeners are invoked
    /// synchronously with `(&new, &old)` in registration order.
    ///
    /// The returned handle removes exactly this listener via
    /// [`WatchHandle::unwatch`]; dropping it without unwatching leaves the
    /// listener installed.
    pub fn watch<F>(&self, prop: &str, listener: F) -> WatchHandle
    where
        F: Fn(&Value, &Value) + 'static,
    {
        let first = {
            let mut watchers = self.inner.watchers.borrow_mut();
            if watchers.contains_key(prop) {
                false
            } else {
                watchers.insert(prop.to_string(), Vec::new());
                true
            }
        };
        if first {
            let _ = self.get(prop);
        }

        let id = self.inner.next_watcher_id.get();
        self.inner.next_watcher_id.set(id + 1);
        if let Some(list) = self.inner.watchers.borrow_mut().get_mut(prop) {
            list.push((id, Rc::new(listener)));
        }

        WatchHandle {
            store: Rc::downgrade(&self.inner),
            prop: prop.to_string(),
            id,
        }
    }

    /// Fully-unwrapped plain snapshot of every declared property, in
    /// declaration order. Computed properties go through the normal lazy
    /// read path, so taking a snapshot may trigger evaluation.
    pub fn raw(&self, include_computed: bool) -> Value {
        let names: Vec<(String, bool)> = self
            .inner
            .props
            .borrow()
            .iter()
            .map(|(name, state)| (name.clone(), matches!(state, PropState::Computed { .. })))
            .collect();

        let mut entries = IndexMap::new();
        for (name, is_computed) in names {
            if is_computed && !include_computed {
                continue;
            }
            let value = self.get(&name).raw();
            entries.insert(name, value);
        }
        Value::Map(entries)
    }

    fn define_static(&self, prop: &str, value: Value) {
        let wrapped = self.wrap_for(prop, value);
        self.inner
            .props
            .borrow_mut()
            .insert(prop.to_string(), PropState::Static { current: wrapped });
        self.inner.graph.borrow_mut().register(prop);
    }

    /// Wrap a value so that a mutation anywhere in its subtree invalidates
    /// `prop`. The callback holds a weak handle; a wrapped value that
    /// outlives its store mutates silently.
    fn wrap_for(&self, prop: &str, value: Value) -> Value {
        let store = Rc::downgrade(&self.inner);
        let prop = prop.to_string();
        let callback: NotifyFn = Rc::new(move || {
            if let Some(inner) = store.upgrade() {
                Store { inner }.invalidate(&prop);
            }
        });
        reactify(&callback, value)
    }

    fn evaluate(&self, prop: &str, compute: ComputedFn, outdated: Option<Value>) -> Value {
        if self.inner.verbose {
            debug!(prop, "re-evaluating computed property");
        }

        // The scope guard restores the outer tracking frame on every exit
        // path; a panicking computed function must not corrupt the tracking
        // of other properties.
        let scope = TrackingScope::enter(&self.inner.tracking, prop);
        let value = compute(self);
        let new_deps = scope.finish();

        let old_deps = {
            let mut props = self.inner.props.borrow_mut();
            match props.get_mut(prop) {
                Some(PropState::Computed { dependencies, .. }) => std::mem::take(dependencies),
                _ => Vec::new(),
            }
        };
        self.inner
            .graph
            .borrow_mut()
            .replace_dependencies(prop, &old_deps, &new_deps);

        {
            let mut props = self.inner.props.borrow_mut();
            if let Some(PropState::Computed {
                cached,
                outdated: pending,
                dependencies,
                ..
            }) = props.get_mut(prop)
            {
                *cached = Some(value.clone());
                *pending = None;
                *dependencies = new_deps.iter().cloned().collect();
            }
        }

        if self.inner.verbose {
            debug!(prop, dependencies = ?new_deps, value = %value, "re-evaluated");
        }

        if let Some(previous) = outdated {
            if !value.identity_eq(&previous) {
                self.notify_watchers(prop, &value, &previous);
            }
        }

        value
    }

    /// Discard a memoized value and propagate through the dependency graph.
    ///
    /// The discarded value moves to the outdated slot; a streak of
    /// invalidations before the next read retains the value captured by the
    /// first. Watched properties are re-read immediately so their listeners
    /// fire. Recursion follows dependency edges depth-first with no cycle
    /// guard.
    fn invalidate(&self, prop: &str) {
        if self.inner.verbose {
            debug!(prop, "invalidating cached value");
        }

        {
            let mut props = self.inner.props.borrow_mut();
            if let Some(PropState::Computed {
                cached, outdated, ..
            }) = props.get_mut(prop)
            {
                if cached.is_some() {
                    *outdated = cached.take();
                }
            }
        }

        let watched = self.inner.watchers.borrow().contains_key(prop);
        if watched {
            let _ = self.get(prop);
        }

        for dependent in self.dependents_of(prop) {
            self.invalidate(&dependent);
        }
    }

    fn dependents_of(&self, prop: &str) -> Vec<String> {
        self.inner.graph.borrow().dependents_of(prop)
    }

    fn notify_watchers(&self, prop: &str, new: &Value, old: &Value) {
        let listeners: Vec<Listener> = {
            let watchers = self.inner.watchers.borrow();
            match watchers.get(prop) {
                Some(list) => list.iter().map(|(_, listener)| Rc::clone(listener)).collect(),
                None => return,
            }
        };
        for listener in listeners {
            listener(new, old);
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("props", &self.keys()).finish()
    }
}

/// Removes one registered listener from a [`Store`].
pub struct WatchHandle {
    store: Weak<StoreInner>,
    prop: String,
    id: usize,
}

impl WatchHandle {
    /// Remove the listener this handle was returned for. Once a property has
    /// no listeners left, its listener list is dropped entirely.
    pub fn unwatch(self) {
        if let Some(inner) = self.store.upgrade() {
            let mut watchers = inner.watchers.borrow_mut();
            if let Some(list) = watchers.get_mut(&self.prop) {
                list.retain(|(id, _)| *id != self.id);
                if list.is_empty() {
                    watchers.shift_remove(&self.prop);
                }
            }
        }
    }
}

/// Scoped acquisition of a tracking frame. `finish` pops the frame and
/// yields the recorded dependency set; on unwind the drop impl pops without
/// yielding, restoring the outer frame.
struct TrackingScope<'a> {
    tracking: &'a RefCell<TrackingContext>,
    finished: bool,
}

impl<'a> TrackingScope<'a> {
    fn enter(tracking: &'a RefCell<TrackingContext>, prop: &str) -> Self {
        tracking.borrow_mut().push(prop);
        Self {
            tracking,
            finished: false,
        }
    }

    fn finish(mut self) -> IndexSet<String> {
        self.finished = true;
        self.tracking.borrow_mut().pop()
    }
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.tracking.borrow_mut().pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(store: &Store, a: &str, b: &str) -> Value {
        let a = store.get(a).as_i64().unwrap_or(0);
        let b = store.get(b).as_i64().unwrap_or(0);
        Value::Int(a + b)
    }

    #[test]
    fn computed_values_are_memoized() {
        let evaluations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&evaluations);

        let store = Store::builder()
            .value("a", 1)
            .value("b", 2)
            .computed("c", move |s| {
                counter.set(counter.get() + 1);
                sum(s, "a", "b")
            })
            .build();

        // lazy: nothing runs before the first read
        assert_eq!(evaluations.get(), 0);

        assert_eq!(store.get("c"), Value::Int(3));
        assert_eq!(store.get("c"), Value::Int(3));
        assert_eq!(evaluations.get(), 1);

        store.set("a", 2);
        assert_eq!(store.get("c"), Value::Int(4));
        assert_eq!(evaluations.get(), 2);
    }

    #[test]
    fn identical_writes_are_no_ops() {
        let store = Store::builder()
            .value("a", 1)
            .computed("c", |s| sum(s, "a", "a"))
            .build();

        assert_eq!(store.get("c"), Value::Int(2));

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let _watch = store.watch("a", move |_, _| counter.set(counter.get() + 1));

        store.set("a", 1);
        assert_eq!(fired.get(), 0);
        assert_eq!(store.get("c"), Value::Int(2));
    }

    #[test]
    fn conditional_dependencies_are_exact() {
        let evaluations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&evaluations);

        let store = Store::builder()
            .value("use_a", true)
            .value("a", 1)
            .value("b", 10)
            .computed("c", move |s| {
                counter.set(counter.get() + 1);
                if s.get("use_a").as_bool().unwrap_or(false) {
                    s.get("a")
                } else {
                    s.get("b")
                }
            })
            .build();

        assert_eq!(store.get("c"), Value::Int(1));
        assert_eq!(evaluations.get(), 1);

        store.set("use_a", false);
        assert_eq!(store.get("c"), Value::Int(10));
        assert_eq!(evaluations.get(), 2);

        // c's last evaluation did not read a, so changing a must not
        // invalidate it
        store.set("a", 2);
        assert_eq!(store.get("c"), Value::Int(10));
        assert_eq!(evaluations.get(), 2);

        store.set("b", 20);
        assert_eq!(store.get("c"), Value::Int(20));
        assert_eq!(evaluations.get(), 3);
    }

    #[test]
    fn chained_invalidation_reaches_transitive_dependents() {
        let store = Store::builder()
            .value("a", 1)
            .computed("c", |s| sum(s, "a", "a"))
            .computed("d", |s| {
                let c = s.get("c").as_i64().unwrap_or(0);
                Value::Int(c * c)
            })
            .build();

        assert_eq!(store.get("d"), Value::Int(4));
        store.set("a", 2);
        assert_eq!(store.get("d"), Value::Int(16));
    }

    #[test]
    fn watcher_on_computed_fires_only_on_actual_change() {
        let store = Store::builder()
            .value("a", 1)
            .computed("positive", |s| {
                Value::Bool(s.get("a").as_i64().unwrap_or(0) > 0)
            })
            .build();

        let fired = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&fired);
        let _watch = store.watch("positive", move |new, old| {
            log.borrow_mut().push((new.clone(), old.clone()));
        });

        // still positive: recomputed, but the value did not change
        store.set("a", 2);
        assert!(fired.borrow().is_empty());

        store.set("a", -1);
        assert_eq!(
            fired.borrow().as_slice(),
            &[(Value::Bool(false), Value::Bool(true))]
        );
    }

    #[test]
    fn runtime_added_properties_are_readable() {
        let store = Store::builder().value("a", 1).build();

        store.set("b", 2);
        assert_eq!(store.get("b"), Value::Int(2));
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn writes_to_computed_properties_are_ignored() {
        let store = Store::builder()
            .value("a", 1)
            .computed("c", |s| sum(s, "a", "a"))
            .build();

        store.set("c", 99);
        assert_eq!(store.get("c"), Value::Int(2));
    }

    #[test]
    fn undeclared_reads_yield_null() {
        let store = Store::builder().value("a", 1).build();
        assert_eq!(store.get("missing"), Value::Null);
    }
}
