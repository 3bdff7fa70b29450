use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::reaction::{reactify, unreactify, NotifyFn};
use crate::value::Value;

/// An observable sequence.
///
/// Every mutating operation delegates to the equivalent `Vec` operation over
/// the private backing store, wraps newly inserted elements with the array's
/// own callback, and fires that callback at most once per call, and only
/// when the operation had an observable effect.
///
/// Writes through [`raw_mut`](ObservableArray::raw_mut) bypass notification
/// entirely; only the listed operations and [`set`](ObservableArray::set)
/// are reactive.
#[derive(Clone)]
pub struct ObservableArray {
    inner: Rc<ArrayInner>,
}

struct ArrayInner {
    items: RefCell<Vec<Value>>,
    silent: Cell<bool>,
    callback: NotifyFn,
}

impl ObservableArray {
    /// Construct from already-wrapped elements. Seeding never notifies.
    pub(crate) fn new(callback: NotifyFn, items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                items: RefCell::new(items),
                silent: Cell::new(false),
                callback,
            }),
        }
    }

    /// Whether two values are handles to the same backing store.
    pub fn handle_eq(&self, other: &ObservableArray) -> bool {
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

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Append an element; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let wrapped = self.wrap(value.into());
        let len = {
            let mut items = self.inner.items.borrow_mut();
            items.push(wrapped);
            items.len()
        };
        self.notify();
        len
    }

    /// Append several elements, notifying once; appending nothing is silent.
    pub fn extend<I>(&self, values: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let wrapped: Vec<Value> = values
            .into_iter()
            .map(|value| self.wrap(value.into()))
            .collect();
        let appended = wrapped.len();
        let len = {
            let mut items = self.inner.items.borrow_mut();
            items.extend(wrapped);
            items.len()
        };
        if appended > 0 {
            self.notify();
        }
        len
    }

    /// Remove the last element; popping an empty array is silent.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.inner.items.borrow_mut().pop();
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Remove the first element; shifting an empty array is silent.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Insert an element at the front; returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let wrapped = self.wrap(value.into());
        let len = {
            let mut items = self.inner.items.borrow_mut();
            items.insert(0, wrapped);
            items.len()
        };
        self.notify();
        len
    }

    /// Replace a range: remove up to `delete_count` elements starting at
    /// `start` and insert `replacement` in their place. Returns the removed
    /// elements. Fires once iff anything was removed or inserted.
    pub fn splice<I>(&self, start: usize, delete_count: usize, replacement: I) -> Vec<Value>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let wrapped: Vec<Value> = replacement
            .into_iter()
            .map(|value| self.wrap(value.into()))
            .collect();
        let inserted = wrapped.len();
        let removed: Vec<Value> = {
            let mut items = self.inner.items.borrow_mut();
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, wrapped).collect()
        };
        if !removed.is_empty() || inserted > 0 {
            self.notify();
        }
        removed
    }

    /// Sort in place using the default [`Value::compare`] order. Always
    /// fires, even when the order did not change.
    pub fn sort(&self) {
        self.inner
            .items
            .borrow_mut()
            .sort_by(|a, b| a.compare(b));
        self.notify();
    }

    /// Sort in place with a caller-supplied comparator. Always fires.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.inner.items.borrow_mut().sort_by(&mut compare);
        self.notify();
    }

    /// Reverse in place. Always fires.
    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.notify();
    }

    /// Explicit indexed write; wraps the value and always fires. Indices
    /// past the end pad the array with `Null`.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let wrapped = self.wrap(value.into());
        {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = wrapped;
        }
        self.notify();
    }

    /// Shallow plain snapshot, one level deep: nested observables inside are
    /// returned as-is.
    pub fn raw(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    /// Direct access to the backing store. Mutations made through the
    /// closure are not observed; this is the un-intercepted write path.
    pub fn raw_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.inner.items.borrow_mut())
    }

    /// Permanently silence this array, recursively unwrap every element and
    /// return the plain snapshot. The handle stays usable, but no future
    /// mutation through it will notify.
    pub fn destroy(&self) -> Vec<Value> {
        self.inner.silent.set(true);
        self.inner.items.borrow().iter().map(unreactify).collect()
    }
}

impl fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
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

    fn array_of(callback: &NotifyFn, items: Vec<i64>) -> ObservableArray {
        match reactify(callback, Value::from(items)) {
            Value::Array(array) => array,
            _ => unreachable!(),
        }
    }

    #[test]
    fn seeding_is_silent() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![1, 2, 3]);
        assert_eq!(count.get(), 0);
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn mutations_fire_once_per_call() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![1, 2, 3]);

        array.push(4);
        assert_eq!(count.get(), 1);

        array.extend([5, 6]);
        assert_eq!(count.get(), 2);

        array.splice(0, 2, [0]);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn ineffective_mutations_are_silent() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![]);

        assert!(array.pop().is_none());
        assert!(array.shift().is_none());
        array.extend(Vec::<Value>::new());
        array.splice(0, 0, Vec::<Value>::new());
        assert_eq!(count.get(), 0);

        // sort and reverse are assumed to always have an effect
        array.sort();
        array.reverse();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn splice_clamps_and_returns_removed() {
        let (callback, _count) = counted();
        let array = array_of(&callback, vec![1, 2, 3]);

        let removed = array.splice(1, 10, [9]);
        assert_eq!(removed, vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(array.raw(), vec![Value::Int(1), Value::Int(9)]);
    }

    #[test]
    fn set_pads_with_null() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![1]);

        array.set(3, 4);
        assert_eq!(
            array.raw(),
            vec![Value::Int(1), Value::Null, Value::Null, Value::Int(4)]
        );
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn raw_mut_bypasses_notification() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![1, 2, 3]);

        array.raw_mut(|items| items[0] = Value::Int(0));
        assert_eq!(count.get(), 0);
        assert_eq!(array.get(0), Some(Value::Int(0)));
    }

    #[test]
    fn destroy_silences_permanently() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![1, 2, 3]);

        let snapshot = array.destroy();
        assert_eq!(snapshot, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        array.push(4);
        array.reverse();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn inserted_containers_become_observable() {
        let (callback, count) = counted();
        let array = array_of(&callback, vec![]);

        array.push(Value::map([("a", 1)]));
        assert_eq!(count.get(), 1);

        let object = array.get(0).unwrap();
        let object = object.as_object().expect("wrapped on insertion");
        object.set("a", 2);
        assert_eq!(count.get(), 2);
    }
}
