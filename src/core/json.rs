// Файл: core/json.rs
// Хелперы для разбора JSON-ответов и конверта с полем `error`.

use super::error::CoreError;
use serde_json::Value;

/// Унифицированная функция парсинга JSON.
/// `context` попадает только в лог (например, URL запроса).
pub fn parse_json_from_text<T: for<'de> serde::Deserialize<'de>>(
    response_text: &str,
    context: &str,
) -> Result<T, CoreError> {
    serde_json::from_str(response_text).map_err(|e| {
        log::warn!("Failed to parse JSON for {}: {}", context, e);
        CoreError::from(e)
    })
}

/// Истинность значения в смысле конверта ответа: null, false, 0 и "" не считаются.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Поле `error`, объявленное самим ответом (если оно есть и истинно).
pub fn declared_error(payload: &Value) -> Option<&Value> {
    payload.get("error").filter(|e| is_truthy(e))
}

/// Объект или массив: единственные формы, которые принимает скриптовый транспорт.
pub fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
