//! Conversion of raw textual values into typed values.
//!
//! Values are stored as text together with a declared type tag. The tag is a
//! hint: a read always states the target type it wants, and a value that does
//! not parse as that type is an error rather than a default.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// A type a raw configuration value can be converted into.
pub trait ConfigValue: Sized {
    /// Name reported in conversion errors.
    const TYPE_NAME: &'static str;

    /// Parses the raw text, returning `None` if it is not a valid `Self`.
    fn parse_config(raw: &str) -> Option<Self>;
}

impl ConfigValue for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_config(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl ConfigValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn parse_config(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl ConfigValue for char {
    const TYPE_NAME: &'static str = "char";

    fn parse_config(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

macro_rules! impl_config_value_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ConfigValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn parse_config(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

impl_config_value_from_str!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl ConfigValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn parse_config(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl ConfigValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn parse_config(raw: &str) -> Option<Self> {
        raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())
    }
}

/// Whole milliseconds, e.g. `"5000"`.
impl ConfigValue for Duration {
    const TYPE_NAME: &'static str = "duration (ms)";

    fn parse_config(raw: &str) -> Option<Self> {
        u64::parse_config(raw).map(Duration::from_millis)
    }
}

impl ConfigValue for serde_json::Value {
    const TYPE_NAME: &'static str = "json";

    fn parse_config(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Logical value kind derived from a declared type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
    Float,
    Json,
    /// Unrecognized tag; the raw text is passed through.
    Other,
}

impl ValueKind {
    /// Maps a declared type tag, case-insensitively.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Self::String,
            "int" | "integer" | "int32" | "int64" | "long" => Self::Integer,
            "bool" | "boolean" => Self::Boolean,
            "double" | "float" | "decimal" | "number" => Self::Float,
            "json" => Self::Json,
            _ => Self::Other,
        }
    }

    /// Converts `raw` into this kind. `name` is only used for the error.
    pub fn convert(self, name: &str, raw: &str) -> crate::Result<TypedValue> {
        fn parse<T: ConfigValue>(name: &str, raw: &str) -> crate::Result<T> {
            T::parse_config(raw)
                .ok_or_else(|| crate::ConfigError::conversion(name, T::TYPE_NAME, raw))
        }

        Ok(match self {
            Self::String => TypedValue::String(raw.to_string()),
            Self::Integer => TypedValue::Integer(parse(name, raw)?),
            Self::Boolean => TypedValue::Boolean(parse(name, raw)?),
            Self::Float => TypedValue::Float(parse(name, raw)?),
            Self::Json => TypedValue::Json(parse(name, raw)?),
            Self::Other => TypedValue::Raw(raw.to_string()),
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::Float => "float",
            Self::Json => "json",
            Self::Other => "raw",
        };
        f.write_str(name)
    }
}

/// A converted value whose type was picked at run time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    Json(serde_json::Value),
    Raw(String),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) | Self::Raw(v) => f.write_str(v),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_parsing() {
        assert_eq!(bool::parse_config("true"), Some(true));
        assert_eq!(bool::parse_config(" False "), Some(false));
        assert_eq!(bool::parse_config("1"), None);
        assert_eq!(bool::parse_config("yes"), None);
    }

    #[test]
    fn test_integer_parsing() {
        assert_eq!(i32::parse_config("42"), Some(42));
        assert_eq!(i32::parse_config(" 50 "), Some(50));
        assert_eq!(i32::parse_config("4.2"), None);
        assert_eq!(u8::parse_config("300"), None);
        assert_eq!(i64::parse_config(""), None);
    }

    #[test]
    fn test_float_rejects_non_finite() {
        assert_eq!(f64::parse_config("2.5"), Some(2.5));
        assert_eq!(f64::parse_config("NaN"), None);
        assert_eq!(f64::parse_config("inf"), None);
    }

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(String::parse_config(" Acme "), Some(" Acme ".to_string()));
        assert_eq!(String::parse_config(""), Some(String::new()));
    }

    #[test]
    fn test_char_requires_single_character() {
        assert_eq!(char::parse_config("x"), Some('x'));
        assert_eq!(char::parse_config("xy"), None);
        assert_eq!(char::parse_config(""), None);
    }

    #[test]
    fn test_duration_is_milliseconds() {
        assert_eq!(
            Duration::parse_config("5000"),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(Duration::parse_config("-1"), None);
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(ValueKind::from_tag("String"), ValueKind::String);
        assert_eq!(ValueKind::from_tag("int"), ValueKind::Integer);
        assert_eq!(ValueKind::from_tag("Boolean"), ValueKind::Boolean);
        assert_eq!(ValueKind::from_tag("double"), ValueKind::Float);
        assert_eq!(ValueKind::from_tag("json"), ValueKind::Json);
        assert_eq!(ValueKind::from_tag("guid"), ValueKind::Other);
    }

    #[test]
    fn test_kind_convert() {
        assert_eq!(
            ValueKind::Integer.convert("MaxItemCount", "50").unwrap(),
            TypedValue::Integer(50)
        );
        assert_eq!(
            ValueKind::Other.convert("Id", "abc").unwrap(),
            TypedValue::Raw("abc".to_string())
        );

        let err = ValueKind::Boolean
            .convert("IsBasketEnabled", "maybe")
            .unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_typed_value_serializes_untagged() {
        let json = serde_json::to_string(&TypedValue::Integer(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&TypedValue::Boolean(true)).unwrap();
        assert_eq!(json, "true");
        assert_eq!(TypedValue::String("Acme".into()).to_string(), "Acme");
    }
}
