// Файл: params/models.rs
// Модели параметров запроса: ParamValue (тегированный вариант) и ParamSet.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use time::OffsetDateTime;

/// Значение параметра. Классификация выполнена заранее, поэтому таблица
/// правил сериализации проверяется по `match`, без инспекции типов в рантайме.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ParamValue>),
    Object(Map<String, Value>),
    Date(OffsetDateTime),
}

impl ParamValue {
    /// Эпоха в миллисекундах (как `Date.valueOf()`).
    pub fn epoch_millis(date: &OffsetDateTime) -> i128 {
        date.unix_timestamp_nanos() / 1_000_000
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ParamValue::Object(_))
    }

    /// JSON-представление; даты превращаются в число миллисекунд.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Number(n) => Value::Number(n.clone()),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Array(items) => Value::Array(items.iter().map(ParamValue::to_json).collect()),
            ParamValue::Object(map) => Value::Object(map.clone()),
            ParamValue::Date(date) => {
                let millis = Self::epoch_millis(date);
                i64::try_from(millis)
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(millis.to_string()))
            }
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => ParamValue::Number(n),
            Value::String(s) => ParamValue::String(s),
            Value::Array(items) => ParamValue::Array(items.into_iter().map(ParamValue::from).collect()),
            Value::Object(map) => ParamValue::Object(map),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        // NaN и бесконечности не представимы в JSON
        Number::from_f64(value).map_or(ParamValue::Null, ParamValue::Number)
    }
}

impl From<OffsetDateTime> for ParamValue {
    fn from(value: OffsetDateTime) -> Self {
        ParamValue::Date(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Набор параметров запроса. Порядок вставки сохраняется и определяет порядок пар на проводе.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    entries: IndexMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Построитель: `ParamSet::new().with("where", "1=1")`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParamSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}
