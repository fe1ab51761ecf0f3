// src/store/observation.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use super::schema::ColumnType;

/// Canonical on-disk date format (day first, as the reports have always stored it).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

// Day-first only; `01/02/2024` is the 1st of February.
const DATE_INPUT_FORMATS: &[&str] = &[DATE_FORMAT, "%Y-%m-%d", "%d-%b-%Y", "%d %B %Y", "%d-%m-%Y"];

/// One typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Date(NaiveDate),
    Text(String),
    Float(f64),
    Integer(i64),
}

impl Value {
    pub fn kind(&self) -> ColumnType {
        match self {
            Value::Date(_) => ColumnType::Date,
            Value::Text(_) => ColumnType::Text,
            Value::Float(_) => ColumnType::Float,
            Value::Integer(_) => ColumnType::Integer,
        }
    }

    /// Parse a raw CSV field as `kind`.
    pub fn parse(kind: ColumnType, raw: &str) -> Result<Value, String> {
        let t = raw.trim();
        match kind {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            ColumnType::Date => parse_date(t)
                .map(Value::Date)
                .ok_or_else(|| format!("`{t}` is not a recognised date")),
            ColumnType::Float => parse_number(t)
                .map(Value::Float)
                .ok_or_else(|| format!("`{t}` is not a number")),
            ColumnType::Integer => {
                let cleaned = t.replace(',', "");
                if let Ok(i) = cleaned.parse::<i64>() {
                    return Ok(Value::Integer(i));
                }
                // tolerate "1234.0" written by older tooling
                match cleaned.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::Integer(f as i64)),
                    _ => Err(format!("`{t}` is not an integer")),
                }
            }
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Canonical text form; also what key comparison uses.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Text(s) => f.write_str(s),
            Value::Float(x) => write!(f, "{x}"),
            Value::Integer(i) => write!(f, "{i}"),
        }
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Parse any of the accepted day-first date spellings.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a number that may carry thousands separators ("12,345.60").
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned = s.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// One fetched data point: column name -> value. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    fields: BTreeMap<String, Value>,
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        self.get(column).and_then(Value::as_date)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_text)
    }
}
