//! Runtime values visible to templates.
//!
//! [`Value`] is the data a [`Context`](crate::Context) holds: JSON-like scalars,
//! lists and maps, plus [`Lambda`]s that templates call instead of reading.
//! Most callers build values from their own types with [`Value::from_serialize`]
//! and add lambdas on top with [`Value::insert`].
//!
//! Rendering never inspects a value ad hoc. It classifies it once into a
//! [`Shape`] and branches on that.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::error::RenderError;
use crate::template::LambdaHelper;

type LambdaFn = dyn Fn(&str, &LambdaHelper<'_>) -> Result<String, RenderError>;

/// A callable value.
///
/// In a section (`{{#name}}...{{/name}}`) the lambda receives the section's
/// unrendered source text and a [`LambdaHelper`] that can render text against
/// the current context. Its return value is emitted verbatim.
///
/// In an interpolation (`{{name}}`) the lambda receives an empty source. Its
/// return value is rendered as a template and then escaped like any other value.
#[derive(Clone)]
pub struct Lambda(Rc<LambdaFn>);

impl Lambda {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &LambdaHelper<'_>) -> Result<String, RenderError> + 'static,
    {
        Lambda(Rc::new(f))
    }

    /// Calls the lambda.
    pub fn call(&self, source: &str, helper: &LambdaHelper<'_>) -> Result<String, RenderError> {
        (self.0)(source, helper)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda(..)")
    }
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A value that can be placed in a template context.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Explicit null. Found by lookups, renders as empty text, falsy in sections.
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Lambda(Lambda),
}

/// How a resolved value drives a section.
///
/// A missing value and a falsy value share [`Shape::Falsy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'v> {
    /// Invoke with the section source and a helper.
    Lambda(&'v Lambda),
    /// Render once per element, each pushed as a frame.
    List(&'v [Value]),
    /// Render once with the value pushed as a frame.
    Scalar(&'v Value),
    /// Render nothing (or, for inverted sections, render once).
    Falsy,
}

impl<'v> Shape<'v> {
    /// Classifies an optional value.
    pub fn of(value: Option<&'v Value>) -> Self {
        match value {
            None => Shape::Falsy,
            Some(Value::Lambda(lambda)) => Shape::Lambda(lambda),
            Some(v) if v.is_falsy() => Shape::Falsy,
            Some(Value::List(items)) => Shape::List(items),
            Some(v) => Shape::Scalar(v),
        }
    }
}

impl Value {
    /// Converts any serializable type into a value.
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use stache_render::Value;
    ///
    /// #[derive(Serialize)]
    /// struct Attempt { name: String, grade: u32 }
    ///
    /// let value = Value::from_serialize(&Attempt { name: "Attempt 1".into(), grade: 7 }).unwrap();
    /// assert_eq!(value.get("grade"), Some(&Value::from(7)));
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, RenderError> {
        Ok(serde_json::to_value(data)?.into())
    }

    /// Creates a lambda value from a closure.
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&str, &LambdaHelper<'_>) -> Result<String, RenderError> + 'static,
    {
        Value::Lambda(Lambda::new(f))
    }

    /// Creates an empty map.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Inserts a key into a map value, builder style.
    ///
    /// Non-map values are replaced by a new map holding only the key.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self {
            Value::Map(map) => {
                map.insert(key.into(), value.into());
                self
            }
            _ => Value::map().insert(key, value),
        }
    }

    /// Looks up one path segment: a key for maps, a decimal index for lists.
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Returns `true` when a section should treat this value as empty.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty() || s == "0",
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Lambda(_) => false,
        }
    }

    /// Returns the string slice for string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text used when the value is interpolated.
    ///
    /// Lists and maps render as compact JSON; lambdas are resolved by the
    /// renderer before this is reached and render as nothing here.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null | Value::Lambda(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => self.to_json().to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Lambda(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => items.iter().map(Value::to_json).collect(),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Value::from(value.clone())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become [`Value::Null`].
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<Lambda> for Value {
    fn from(lambda: Lambda) -> Self {
        Value::Lambda(lambda)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
