// 📎 Typed Attributes - free-form key → value data carried by a document
//
//   <attribute name="issued" type="time" value="2024-05-02T00:00:00+00:00"/>
//   <attribute name="total" type="number" value="-18000"/>
//   <attribute name="vendor" type="string" value="Plumber &amp; Sons"/>
//
// Entries are written in key order. A format string such as
// "%{vendor} %{issued%y}-%{issued%M}" builds display text from the map;
// unknown keys render as "undef".

use crate::accessor::{Placement, ScalarSlot, SerializationAccessor};
use crate::error::ConversionError;
use crate::serializable::Serializable;
use crate::value::ScalarValue;
use chrono::{DateTime, Datelike, Utc};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use tracing::warn;

/// Element name used for each stored attribute
pub const ATTRIBUTE_ELEMENT: &str = "attribute";

// ============================================================================
// VALUE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttrKind {
    #[default]
    String,
    Number,
    Time,
}

impl AttrKind {
    pub fn name(self) -> &'static str {
        match self {
            AttrKind::String => "string",
            AttrKind::Number => "number",
            AttrKind::Time => "time",
        }
    }
}

impl ScalarValue for AttrKind {
    const TYPE_NAME: &'static str = "attribute type";

    fn to_text(&self) -> Option<String> {
        Some(self.name().to_string())
    }

    fn from_text(text: &str) -> Result<Self, ConversionError> {
        match text.trim() {
            "string" => Ok(AttrKind::String),
            "number" => Ok(AttrKind::Number),
            "time" => Ok(AttrKind::Time),
            _ => Err(ConversionError::new(Self::TYPE_NAME, text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Number(i64),
    Time(DateTime<Utc>),
}

impl Default for AttrValue {
    fn default() -> Self {
        AttrValue::String(String::new())
    }
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::String(_) => AttrKind::String,
            AttrValue::Number(_) => AttrKind::Number,
            AttrValue::Time(_) => AttrKind::Time,
        }
    }

    pub fn parse(kind: AttrKind, text: &str) -> Result<Self, ConversionError> {
        match kind {
            AttrKind::String => Ok(AttrValue::String(text.to_string())),
            AttrKind::Number => i64::from_text(text).map(AttrValue::Number),
            AttrKind::Time => DateTime::<Utc>::from_text(text).map(AttrValue::Time),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            AttrValue::Time(t) => Some(t),
            _ => None,
        }
    }

    /// Render with a format spec:
    /// - `A` amount in cents as "-12.50"
    /// - `M` two-digit month, `y` four-digit year
    /// - `date:<strftime>` any chrono date format
    ///
    /// A spec that does not fit the value falls back to plain text.
    pub fn format_with(&self, spec: &str) -> String {
        match (spec, self) {
            ("A", AttrValue::Number(cents)) => format_amount(*cents),
            ("M", AttrValue::Time(time)) => format!("{:02}", time.month()),
            ("y", AttrValue::Time(time)) => format!("{:04}", time.year()),
            (spec, AttrValue::Time(time)) if spec.starts_with("date:") => {
                let mut out = String::new();
                match write!(out, "{}", time.format(&spec["date:".len()..])) {
                    Ok(()) => out,
                    Err(_) => self.to_string(),
                }
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => f.write_str(s),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Time(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(t: DateTime<Utc>) -> Self {
        AttrValue::Time(t)
    }
}

/// Cents → "1234.50" / "-0.05"
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

// ============================================================================
// STORED ENTRY
// ============================================================================

// `type` and `value` are two XML attributes describing one typed value, so
// both slots share the kind through a Cell.
struct KindSlot<'a>(&'a Cell<AttrKind>);

impl ScalarSlot for KindSlot<'_> {
    fn text(&self) -> Option<String> {
        self.0.get().to_text()
    }

    fn assign(&mut self, text: &str) -> Result<(), ConversionError> {
        self.0.set(AttrKind::from_text(text)?);
        Ok(())
    }
}

struct ValueSlot<'a> {
    kind: &'a Cell<AttrKind>,
    value: &'a mut AttrValue,
}

impl ScalarSlot for ValueSlot<'_> {
    fn text(&self) -> Option<String> {
        match &*self.value {
            AttrValue::String(s) if s.is_empty() => None,
            value => Some(value.to_string()),
        }
    }

    fn assign(&mut self, text: &str) -> Result<(), ConversionError> {
        *self.value = AttrValue::parse(self.kind.get(), text)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct Entry {
    name: String,
    kind: Cell<AttrKind>,
    value: AttrValue,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Serializable for Entry {
    fn serialization_accessor(&mut self) -> SerializationAccessor<'_> {
        SerializationAccessor::new()
            .with_scalar("name", &mut self.name)
            .with_custom("type", Placement::Attribute, Box::new(KindSlot(&self.kind)))
            .with_custom(
                "value",
                Placement::Attribute,
                Box::new(ValueSlot {
                    kind: &self.kind,
                    value: &mut self.value,
                }),
            )
    }

    fn prepare_write(&mut self) {
        self.kind.set(self.value.kind());
    }

    fn finished_read(&mut self) {
        // `value` was met before `type`
        let kind = self.kind.get();
        if self.value.kind() == kind {
            return;
        }
        match AttrValue::parse(kind, &self.value.to_string()) {
            Ok(value) => self.value = value,
            Err(err) => warn!(attribute = %self.name, "{}; kept as text", err),
        }
    }
}

// ============================================================================
// ATTRIBUTE MAP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: BTreeMap<String, Entry>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        let kind = Cell::new(value.kind());
        self.entries.insert(name.clone(), Entry { name, kind, value });
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.entries.remove(name).map(|e| e.value)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(name, e)| (name.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every `%{key}` or `%{key%spec}` in `pattern`.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::new();
        let mut rest = pattern;
        while let Some((before, key, spec, after)) = next_placeholder(rest) {
            out.push_str(before);
            match self.get(key) {
                None => out.push_str("undef"),
                Some(value) => match spec {
                    Some(spec) => out.push_str(&value.format_with(spec)),
                    None => out.push_str(&value.to_string()),
                },
            }
            rest = after;
        }
        out.push_str(rest);
        out
    }

    /// Keys a format pattern uses, with the kind its spec expects.
    pub fn required(pattern: &str) -> BTreeMap<String, AttrKind> {
        let mut required = BTreeMap::new();
        let mut rest = pattern;
        while let Some((_, key, spec, after)) = next_placeholder(rest) {
            let kind = match spec {
                Some("A") => AttrKind::Number,
                Some("M") | Some("y") => AttrKind::Time,
                Some(spec) if spec.starts_with("date:") => AttrKind::Time,
                _ => AttrKind::String,
            };
            required.insert(key.to_string(), kind);
            rest = after;
        }
        required
    }
}

/// Split `text` around its first well-formed placeholder:
/// (text before, key, spec, text after)
fn next_placeholder(text: &str) -> Option<(&str, &str, Option<&str>, &str)> {
    let mut search = 0;
    loop {
        let start = search + text[search..].find("%{")?;
        let body_start = start + 2;
        let end = body_start + text[body_start..].find('}')?;
        let body = &text[body_start..end];
        let (key, spec) = match body.split_once('%') {
            Some((key, spec)) => (key, Some(spec)),
            None => (body, None),
        };
        if key.is_empty() || spec == Some("") {
            search = body_start;
            continue;
        }
        return Some((&text[..start], key, spec, &text[end + 1..]));
    }
}

impl<'a> SerializationAccessor<'a> {
    /// Builder: typed attributes, one `<name name=".." type=".." value=".."/>`
    /// per entry
    pub fn with_attributes(self, name: &'static str, attributes: &'a mut Attributes) -> Self {
        self.with_child_map(name, &mut attributes.entries, "name")
    }
}
