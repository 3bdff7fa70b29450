use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::reaction::{reactify, unreactify, NotifyFn};
use crate::value::Value;

/// An observable keyed mapping with insertion-ordered keys.
///
/// Writes to declared keys are reactive: the new value is wrapped with the
/// object's own callback, and the callback fires once per write, unless the
/// new value is identical to the old one. New keys are added at runtime via
/// [`define`](ObservableObject::define), which rejects redefinition.
#[derive(Clone)]
pub struct ObservableObject {
    inner: Rc<ObjectInner>,
}

struct ObjectInner {
    entries: RefCell<IndexMap<String, Value>>,
    silent: Cell<bool>,
    callback: NotifyFn,
}

impl ObservableObject {
    /// Construct from already-wrapped entries. Seeding never notifies.
    pub(crate) fn new(callback: NotifyFn, entries: IndexMap<String, Value>) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                entries: RefCell::new(entries),
                silent: Cell::new(false),
                callback,
            }),
        }
    }

    /// Whether two values are handles to the same backing store.
    pub fn handle_eq(&self, other: &ObservableObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self) {
        if !self.inner.silent.get() {
            (self.inner.callback)();
        }
    }

    fn wrap(&self, value: Value) -> Value {
        reactify(&self.inner.callback, value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Write to a key. The value is wrapped and stored unconditionally, but
    /// the callback fires only when the new value is not identical to the
    /// old one. A write to an undeclared key inserts it silently; that is
    /// the un-intercepted path, use [`define`](ObservableObject::define) to
    /// add keys reactively.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let (wrapped, affected) = {
            let entries = self.inner.entries.borrow();
            match entries.get(key) {
                Some(current) => (self.wrap(value.clone()), !value.identity_eq(current)),
                None => (self.wrap(value), false),
            }
        };
        self.inner
            .entries
            .borrow_mut()
            .insert(key.to_string(), wrapped);
        if affected {
            self.notify();
        }
    }

    /// Define a new key at runtime; the value is wrapped and the callback
    /// fires once. Fails if the key already exists.
    pub fn define(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        if self.contains_key(key) {
            return Err(Error::DuplicateProperty(key.to_string()));
        }
        let wrapped = self.wrap(value.into());
        self.inner
            .entries
            .borrow_mut()
            .insert(key.to_string(), wrapped);
        self.notify();
        Ok(())
    }

    /// Shallow plain snapshot, keys in insertion order, one level deep:
    /// nested observables inside are returned as-is.
    pub fn raw(&self) -> IndexMap<String, Value> {
        self.inner.entries.borrow().clone()
    }

    /// Permanently silence this object, recursively unwrap every child and
    /// return the plain snapshot. The handle stays usable, but no future
    /// mutation through it will notify.
    pub fn destroy(&self) -> IndexMap<String, Value> {
        self.inner.silent.set(true);
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), unreactify(value)))
            .collect()
    }
}

impl fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.entries.borrow().iter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted() -> (NotifyFn, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let callback: NotifyFn = Rc::new(move || counter.set(counter.get() + 1));
        (callback, count)
    }

    fn object_of(callback: &NotifyFn, value: Value) -> ObservableObject {
        match reactify(callback, value) {
            Value::Object(object) => object,
            _ => unreachable!(),
        }
    }

    #[test]
    fn seeding_is_silent() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", 1), ("b", 2)]));
        assert_eq!(count.get(), 0);
        assert_eq!(object.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn writes_fire_unless_identical() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", 1)]));

        object.set("a", 2);
        assert_eq!(count.get(), 1);

        // identical value: re-wrapped but silent
        object.set("a", 2);
        assert_eq!(count.get(), 1);

        // a fresh plain container is never identical to the stored one
        object.set("a", Value::list([1]));
        object.set("a", Value::list([1]));
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn define_rejects_duplicates() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", 1)]));

        object.define("b", 2).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(object.get("b"), Some(Value::Int(2)));

        let err = object.define("a", 3).unwrap_err();
        assert!(matches!(err, Error::DuplicateProperty(key) if key == "a"));
    }

    #[test]
    fn undeclared_writes_are_silent() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", 1)]));

        object.set("b", 2);
        assert_eq!(count.get(), 0);
        assert_eq!(object.get("b"), Some(Value::Int(2)));
    }

    #[test]
    fn nested_values_are_wrapped_on_write() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", 1)]));

        object.set("a", Value::map([("x", 1)]));
        assert_eq!(count.get(), 1);

        let nested = object.get("a").unwrap();
        let nested = nested.as_object().expect("wrapped on write");
        nested.set("x", 2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn destroy_silences_and_unwraps() {
        let (callback, count) = counted();
        let object = object_of(&callback, Value::map([("a", Value::list([1, 2]))]));

        let snapshot = object.destroy();
        assert_eq!(snapshot.get("a"), Some(&Value::list([1, 2])));

        object.set("a", 3);
        assert_eq!(count.get(), 0);
    }
}
