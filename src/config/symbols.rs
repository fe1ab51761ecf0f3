// src/config/symbols.rs
//! External NIFTY 50 ticker lists: `symbols = [...]` in TOML, or a JSON
//! array or `{"symbols": [...]}` object.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SymbolList {
    Table { symbols: Vec<String> },
    Bare(Vec<String>),
}

impl SymbolList {
    fn into_vec(self) -> Vec<String> {
        match self {
            SymbolList::Table { symbols } | SymbolList::Bare(symbols) => symbols,
        }
    }
}

/// Raw entries of a symbol file; `.json` files are read as JSON, anything else as TOML.
pub fn load_symbols_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading symbol list from {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let list: SymbolList = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON symbol list {}", path.display()))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("parsing TOML symbol list {}", path.display()))?
    };
    Ok(list.into_vec())
}

/// NSE equity (`TCS.NS`, `M&M.NS`, `BAJAJ-AUTO.NS`) or index (`^NSEI`).
pub fn is_ticker(s: &str) -> bool {
    if let Some(index) = s.strip_prefix('^') {
        return !index.is_empty()
            && index
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.');
    }
    match s.strip_suffix(".NS") {
        Some(stem) if !stem.is_empty() => stem
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '&' || c == '-'),
        _ => false,
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CleanSymbols {
    /// Sorted, unique.
    pub accepted: Vec<String>,
    /// Non-empty entries that are not tickers, in input order.
    pub rejected: Vec<String>,
}

/// Trim, drop blanks, split tickers from junk, de-duplicate and sort the tickers.
pub fn clean_symbols(items: Vec<String>) -> CleanSymbols {
    let mut accepted = BTreeSet::new();
    let mut rejected = Vec::new();
    for item in items {
        let t = item.trim();
        if t.is_empty() {
            continue;
        }
        if is_ticker(t) {
            accepted.insert(t.to_string());
        } else {
            rejected.push(t.to_string());
        }
    }
    CleanSymbols {
        accepted: accepted.into_iter().collect(),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(ext: &str, body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn toml_table_and_json_shapes_load() {
        let toml = file(".toml", r#"symbols = ["TCS.NS", "INFY.NS"]"#);
        let bare = file(".json", r#"["RELIANCE.NS", "M&M.NS"]"#);
        let table = file(".json", r#"{"symbols": ["ITC.NS"]}"#);
        assert_eq!(load_symbols_from(toml.path()).unwrap(), ["TCS.NS", "INFY.NS"]);
        assert_eq!(load_symbols_from(bare.path()).unwrap(), ["RELIANCE.NS", "M&M.NS"]);
        assert_eq!(load_symbols_from(table.path()).unwrap(), ["ITC.NS"]);
    }

    #[test]
    fn loading_does_not_clean() {
        let f = file(".json", r#"[" TCS.NS ", "", "TCS.NS"]"#);
        assert_eq!(load_symbols_from(f.path()).unwrap(), [" TCS.NS ", "", "TCS.NS"]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_symbols_from(file(".txt", "not a list").path()).is_err());
        assert!(load_symbols_from(file(".json", r#"{"tickers": ["TCS.NS"]}"#).path()).is_err());
        assert!(load_symbols_from(file(".toml", r#"symbols = "TCS.NS""#).path()).is_err());
    }

    #[test]
    fn ticker_shapes() {
        for ok in ["TCS.NS", "M&M.NS", "BAJAJ-AUTO.NS", "^NSEI", "^NSEBANK"] {
            assert!(is_ticker(ok), "{ok}");
        }
        for bad in [".NS", "^", "tcs.ns", "TCS", "TCS.BO", "TCS NS", "TCS.NS.NS "] {
            assert!(!is_ticker(bad), "{bad}");
        }
    }

    #[test]
    fn clean_splits_and_dedups() {
        let raw = [" TCS.NS ", "", "INFY.NS", "reliance", "INFY.NS", "   ", "ITC"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            clean_symbols(raw),
            CleanSymbols {
                accepted: vec!["INFY.NS".into(), "TCS.NS".into()],
                rejected: vec!["reliance".into(), "ITC".into()],
            }
        );
    }
}
