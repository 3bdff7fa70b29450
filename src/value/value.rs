use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::observable::{ObservableArray, ObservableObject};

/// A dynamically typed value held by a [`Store`](crate::Store) or nested
/// inside an observable container.
///
/// Plain structured values (`List`, `Map`) describe data on its way into the
/// system. Once a value is adopted by a store, or inserted into a container
/// that is already observable, its structured parts are wrapped into the
/// `Array` and `Object` variants, which are cheap shared handles into live
/// backing storage.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A plain sequence, not yet under observation.
    List(Vec<Value>),
    /// A plain keyed mapping, not yet under observation.
    Map(IndexMap<String, Value>),
    /// A wrapped, observable sequence.
    Array(ObservableArray),
    /// A wrapped, observable keyed mapping.
    Object(ObservableObject),
}

impl Value {
    /// True for plain structured values that wrapping would convert into
    /// observable containers.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// True for values that are already wrapped in an observable container.
    pub fn is_observable(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// True for everything that is neither structured nor observable.
    pub fn is_primitive(&self) -> bool {
        !self.is_structured() && !self.is_observable()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ObservableArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObservableObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Identity comparison, used to decide whether a write changed anything.
    ///
    /// Primitives compare by value (`Float` NaN is identical to nothing,
    /// itself included), observable containers by handle identity, and plain
    /// containers are never identical: a freshly built `List` or `Map` is
    /// always a new value, even when structurally equal to the old one.
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.handle_eq(b),
            (Value::Object(a), Value::Object(b)) => a.handle_eq(b),
            _ => false,
        }
    }

    /// Default sort order for [`ObservableArray::sort`]: primitives first
    /// (null, bools, numbers, strings), containers last in stable order.
    pub fn compare(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::Str(_) => 3,
                _ => 4,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) if rank(a) == 2 && rank(b) == 2 => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Fully-unwrapped deep plain snapshot: every observable container in the
    /// subtree is replaced by its plain counterpart. Non-destructive; wrapper
    /// state is untouched.
    pub fn raw(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::raw).collect()),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.raw()))
                    .collect(),
            ),
            Value::Array(array) => Value::List(array.raw().iter().map(Value::raw).collect()),
            Value::Object(object) => Value::Map(
                object
                    .raw()
                    .into_iter()
                    .map(|(key, value)| (key, value.raw()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Build a plain `List` from anything convertible to values.
    pub fn list<I, T>(items: I) -> Value
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a plain `Map` from key/value pairs, preserving insertion order.
    pub fn map<I, K, T>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Deep structural equality. Observable containers compare by handle
/// identity; compare snapshots via [`Value::raw`] for contents.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.handle_eq(b),
            (Value::Object(a), Value::Object(b)) => a.handle_eq(b),
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        fn write_map(f: &mut fmt::Formatter<'_>, entries: &IndexMap<String, Value>) -> fmt::Result {
            write!(f, "{{")?;
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, "}}")
        }

        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => write_list(f, items),
            Value::Map(entries) => write_map(f, entries),
            Value::Array(array) => write_list(f, &array.raw()),
            Value::Object(object) => write_map(f, &object.raw()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Value {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(Value::Int(1).is_primitive());
        assert!(Value::Str("x".into()).is_primitive());
        assert!(Value::list([1, 2]).is_structured());
        assert!(Value::map([("a", 1)]).is_structured());
        assert!(!Value::list([1]).is_primitive());
    }

    #[test]
    fn identity_of_primitives() {
        assert!(Value::Int(1).identity_eq(&Value::Int(1)));
        assert!(!Value::Int(1).identity_eq(&Value::Float(1.0)));
        assert!(!Value::Float(f64::NAN).identity_eq(&Value::Float(f64::NAN)));
    }

    #[test]
    fn plain_containers_are_never_identical() {
        let a = Value::list([1, 2, 3]);
        let b = Value::list([1, 2, 3]);
        assert!(!a.identity_eq(&b));
        assert!(!a.identity_eq(&a.clone()));
        // but they are structurally equal
        assert_eq!(a, b);
    }

    #[test]
    fn default_order() {
        let mut items = vec![Value::Int(3), Value::Int(1), Value::Int(2)];
        items.sort_by(|a, b| a.compare(b));
        assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        assert_eq!(
            Value::Null.compare(&Value::Str("a".into())),
            Ordering::Less
        );
        assert_eq!(
            Value::Int(2).compare(&Value::Float(1.5)),
            Ordering::Greater
        );
    }
}
