use std::rc::Rc;

use crate::observable::{ObservableArray, ObservableObject};
use crate::value::Value;

/// Notification callback threaded through a wrapped subtree. A mutation at
/// any depth invokes the callback of the owner that requested the wrap.
pub type NotifyFn = Rc<dyn Fn()>;

/// Recursively wrap a value for observation.
///
/// Already-wrapped values are returned unchanged, so wrapping is idempotent.
/// Plain containers are converted into observable containers seeded with
/// their (recursively wrapped) contents; everything else passes through
/// untouched. The same `callback` is handed to every container in the
/// subtree.
pub fn reactify(callback: &NotifyFn, value: Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => value,
        Value::List(items) => {
            let items = items
                .into_iter()
                .map(|item| reactify(callback, item))
                .collect();
            Value::Array(ObservableArray::new(Rc::clone(callback), items))
        }
        Value::Map(entries) => {
            let entries = entries
                .into_iter()
                .map(|(key, value)| (key, reactify(callback, value)))
                .collect();
            Value::Object(ObservableObject::new(Rc::clone(callback), entries))
        }
        other => other,
    }
}

/// Non-destructive deep plain snapshot of a possibly-wrapped value.
pub fn raw(value: &Value) -> Value {
    value.raw()
}

/// Destructive counterpart of [`raw`]: permanently silences every observable
/// container in the subtree and returns the plain snapshot.
pub fn unreactify(value: &Value) -> Value {
    match value {
        Value::Array(array) => Value::List(array.destroy()),
        Value::Object(object) => Value::Map(object.destroy()),
        other => other.clone(),
    }
}
