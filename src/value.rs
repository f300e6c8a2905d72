// 🔤 Scalar Values - text conversions for persisted attributes
//
// Every scalar attribute goes through text: the writer asks for the text of a
// field, the reader hands text back. `None` from `to_text` means "absent":
// nothing is written at all. Empty strings and `false` are absent, so a
// missing attribute and a default one read back identically.
//
// List items are the exception: every item is written, since dropping one
// would shift the positions of the rest.

use crate::error::ConversionError;
use chrono::{DateTime, NaiveDate, Utc};

/// Date format used for calendar dates in documents
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// VALUE
// ============================================================================

/// What a descriptor yields when asked for its current value.
///
/// Child objects are not values: they are walked through their own accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Absent,
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        match self {
            Value::Absent => true,
            Value::Scalar(_) => false,
            Value::List(items) => items.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Option<String>> for Value {
    fn from(text: Option<String>) -> Self {
        match text {
            Some(text) => Value::Scalar(text),
            None => Value::Absent,
        }
    }
}

// ============================================================================
// SCALAR VALUE
// ============================================================================

/// A field type that can be stored as a single piece of text.
pub trait ScalarValue: Sized {
    /// Name used in conversion error messages
    const TYPE_NAME: &'static str;

    /// Text to write, or `None` when the value is semantically absent
    fn to_text(&self) -> Option<String>;

    /// Parse text read from a document
    fn from_text(text: &str) -> Result<Self, ConversionError>;

    /// Text of this value as one list item, which is never absent
    fn item_text(&self) -> String {
        self.to_text().unwrap_or_default()
    }
}

impl ScalarValue for String {
    const TYPE_NAME: &'static str = "string";

    fn to_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.clone())
        }
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        Ok(text.to_string())
    }
}

macro_rules! integer_scalar {
    ($($ty:ty),*) => {
        $(
            impl ScalarValue for $ty {
                const TYPE_NAME: &'static str = "integer";

                fn to_text(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn from_text(text: &str) -> Result<Self, ConversionError> {
                    text.trim()
                        .parse()
                        .map_err(|_| ConversionError::new(Self::TYPE_NAME, text))
                }
            }
        )*
    };
}

integer_scalar!(i32, i64, u32, u64, usize);

impl ScalarValue for f64 {
    const TYPE_NAME: &'static str = "number";

    fn to_text(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        text.trim()
            .parse()
            .map_err(|_| ConversionError::new(Self::TYPE_NAME, text))
    }
}

/// `false` is never written: absence and `false` are the same thing.
impl ScalarValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn to_text(&self) -> Option<String> {
        if *self {
            Some("true".to_string())
        } else {
            None
        }
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(ConversionError::new(Self::TYPE_NAME, text)),
        }
    }

    fn item_text(&self) -> String {
        self.to_string()
    }
}

impl ScalarValue for NaiveDate {
    const TYPE_NAME: &'static str = "date";

    fn to_text(&self) -> Option<String> {
        Some(self.format(DATE_FORMAT).to_string())
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map_err(|_| ConversionError::new(Self::TYPE_NAME, text))
    }
}

impl ScalarValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "timestamp";

    fn to_text(&self) -> Option<String> {
        Some(self.to_rfc3339())
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ConversionError::new(Self::TYPE_NAME, text))
    }
}

/// Optional fields are absent when `None`.
impl<T: ScalarValue> ScalarValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn to_text(&self) -> Option<String> {
        self.as_ref().and_then(ScalarValue::to_text)
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        T::from_text(text).map(Some)
    }
}
