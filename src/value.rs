//! A small tagged value type for RESTful handler return values (§4.11.1,
//! §9 redesign note): handlers return a `Value` (directly, or anything
//! implementing `ToValue`), which the routing layer serializes to JSON
//! unless it is already a byte string.

use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

/// Implemented by anything a RESTful handler may return directly.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_to_value_int {
    ($($t:ty),*) => {
        $(impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        })*
    };
}
impl_to_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl ToValue for SystemTime {
    fn to_value(&self) -> Value {
        let datetime: chrono::DateTime<chrono::Utc> = (*self).into();
        Value::Str(datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for [(String, T)] {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}

/// Is this value already a byte string (so the router should emit its
/// bytes verbatim instead of wrapping it in JSON)?
pub fn is_byte_string(value: &Value) -> bool {
    matches!(value, Value::Bytes(_))
}

/// Serialize a `Value` to JSON text (§4.11.1: "emitted as JSON if not
/// already a byte-string").
pub fn to_json(value: &Value) -> String {
    let mut out = String::new();
    write_json(value, &mut out);
    out
}

fn write_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&f.to_string()),
        Value::Str(s) => write_json_string(s, out),
        Value::Bytes(b) => write_json_string(&String::from_utf8_lossy(b), out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json(item, out);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_json(val, out);
            }
            out.push('}');
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn primitives_serialize_to_json() {
        assert_eq!(to_json(&42i32.to_value()), "42");
        assert_eq!(to_json(&true.to_value()), "true");
        assert_eq!(to_json(&"hi".to_value()), "\"hi\"");
    }

    #[test]
    fn maps_and_lists_nest() {
        let value = Value::Map(vec![
            ("name".to_string(), Value::Str("alice".to_string())),
            ("tags".to_string(), Value::List(vec![Value::Int(1), Value::Int(2)])),
        ]);
        assert_eq!(to_json(&value), r#"{"name":"alice","tags":[1,2]}"#);
    }

    #[test]
    fn byte_strings_are_flagged_for_passthrough() {
        assert!(is_byte_string(&Value::Bytes(b"raw".to_vec())));
        assert!(!is_byte_string(&Value::Str("raw".to_string())));
    }

    #[test]
    fn strings_escape_control_characters() {
        let value = Value::Str("a\"b\\c\n".to_string());
        assert_eq!(to_json(&value), r#""a\"b\\c\n""#);
    }

    #[test]
    fn option_none_is_null() {
        let value: Option<i32> = None;
        assert_eq!(to_json(&value.to_value()), "null");
    }
}
