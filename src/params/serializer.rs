// Файл: params/serializer.rs
// Сериализация ParamSet в URL-кодированную строку запроса.

use super::models::{ParamSet, ParamValue};
use crate::core::json::is_truthy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Number, Value};
use std::fmt;

pub const FORMAT_KEY: &str = "f";
pub const DEFAULT_FORMAT: &str = "json";
pub const CALLBACK_KEY: &str = "callback";

/// Символы, которые НЕ кодируются (как encodeURIComponent):
/// unreserved по RFC 3986 плюс `!`, `'`, `(`, `)`, `*`.
const URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Готовая строка запроса: пары `key=value`, склеенные через `&`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializedQuery(String);

impl SerializedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Длина полного GET-адреса `url?query` в UTF-16 единицах.
    pub fn request_length(&self, url: &str) -> usize {
        url.encode_utf16().count() + 1 + self.0.encode_utf16().count()
    }
}

impl fmt::Display for SerializedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SerializedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Сериализует набор параметров. Исходный набор не меняется:
/// значение по умолчанию `f=json` применяется к копии.
pub fn serialize(params: &ParamSet) -> SerializedQuery {
    encode_pairs(&with_defaults(params.clone()))
}

/// То же, но с добавленным `callback=<path>` (для скриптового транспорта).
pub fn serialize_with_callback(params: &ParamSet, callback_path: &str) -> SerializedQuery {
    let mut copy = params.clone();
    copy.insert(CALLBACK_KEY, callback_path);
    encode_pairs(&with_defaults(copy))
}

fn with_defaults(mut params: ParamSet) -> ParamSet {
    // `f` сохраняется, только если значение истинно; иначе заменяется на месте или дописывается в конец.
    let keep = params.get(FORMAT_KEY).map_or(false, |value| is_truthy(&value.to_json()));
    if !keep {
        params.insert(FORMAT_KEY, DEFAULT_FORMAT);
    }
    params
}

fn encode_pairs(params: &ParamSet) -> SerializedQuery {
    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, URI_COMPONENT_SET),
                utf8_percent_encode(&encode_value(value), URI_COMPONENT_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    SerializedQuery(query)
}

/// Таблица правил для одного значения (до percent-encoding).
pub fn encode_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Array(items) => match items.first() {
            Some(first) if first.is_object() => value.to_json().to_string(),
            _ => join_plain(items),
        },
        ParamValue::Object(map) => Value::Object(map.clone()).to_string(),
        ParamValue::Date(date) => ParamValue::epoch_millis(date).to_string(),
        ParamValue::Null => "null".to_string(),
        other => plain_string(other),
    }
}

fn join_plain(items: &[ParamValue]) -> String {
    items.iter().map(plain_string).collect::<Vec<_>>().join(",")
}

// Строковая форма элемента списка: null даёт пустую строку, вложенные списки склеиваются.
fn plain_string(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => String::new(),
        ParamValue::Bool(b) => b.to_string(),
        ParamValue::Number(n) => number_to_string(n),
        ParamValue::String(s) => s.clone(),
        ParamValue::Array(items) => join_plain(items),
        ParamValue::Object(map) => Value::Object(map.clone()).to_string(),
        ParamValue::Date(date) => ParamValue::epoch_millis(date).to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        // Экспонента нужна только ниже 1e-6; ryu переходит на неё раньше.
        Some(f) if n.is_f64() && f.abs() >= 1e-6 => {
            let repr = n.to_string();
            expand_exponent(&repr).unwrap_or(repr)
        }
        _ => n.to_string(),
    }
}

// "1.5e-6" -> "0.0000015". Для записи без экспоненты возвращает None.
fn expand_exponent(repr: &str) -> Option<String> {
    let (mantissa, exponent) = repr.split_once(['e', 'E'])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", int_part, frac_part);
    let point = int_part.len() as i32 + exponent;

    let expanded = if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (head, tail) = digits.split_at(point as usize);
        format!("{}.{}", head, tail)
    };
    Some(format!("{}{}", sign, expanded))
}
