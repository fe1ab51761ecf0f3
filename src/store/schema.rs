// src/store/schema.rs
use std::collections::HashSet;

use super::observation::Observation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    Text,
    Float,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// Ordered, typed column list for one report's history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new<'a>(columns: impl IntoIterator<Item = (&'a str, ColumnType)>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, kind)| Column {
                    name: name.to_string(),
                    kind,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The observation must carry exactly these columns, each with its declared type.
    pub fn check_observation(&self, obs: &Observation) -> Result<(), String> {
        for col in &self.columns {
            match obs.get(&col.name) {
                None => return Err(format!("missing column `{}`", col.name)),
                Some(v) if v.kind() != col.kind => {
                    return Err(format!(
                        "column `{}` expects {:?}, got {:?}",
                        col.name,
                        col.kind,
                        v.kind()
                    ))
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = obs.columns().find(|c| self.column(c).is_none()) {
            return Err(format!("unexpected column `{extra}`"));
        }
        Ok(())
    }

    /// For each schema column, the index of that column in `header`.
    /// The header must hold exactly the schema's column set, in any order.
    pub fn header_positions(&self, header: &csv::StringRecord) -> Result<Vec<usize>, String> {
        let mut seen = HashSet::new();
        for name in header.iter() {
            if !seen.insert(name) {
                return Err(format!("duplicate column `{name}` in header"));
            }
            if self.column(name).is_none() {
                return Err(format!("unexpected column `{name}` in header"));
            }
        }
        self.columns
            .iter()
            .map(|col| {
                header
                    .iter()
                    .position(|h| h == col.name)
                    .ok_or_else(|| format!("missing column `{}` in header", col.name))
            })
            .collect()
    }
}
