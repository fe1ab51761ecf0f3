// src/store/mod.rs
//! Append-only CSV history with last-write-wins deduplication.
//!
//! Every report persists through [`TimeSeriesAppendStore::merge_and_persist`]:
//! existing rows are loaded, the new rows are appended after them, rows that
//! share a key collapse to the last one appended (kept at the position where
//! the key first appeared), and the result atomically replaces the file.

pub mod observation;
pub mod schema;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::error::StoreError;
use crate::history::History;

pub use observation::{Observation, Value};
pub use schema::{Column, ColumnType, Schema};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("store_merges_total", "History merges that rewrote a file.");
        describe_counter!(
            "store_rows_written_total",
            "Rows written across all history files."
        );
        describe_counter!(
            "store_malformed_total",
            "History files rejected as not matching their schema."
        );
    });
}

#[derive(Debug, Clone)]
pub struct TimeSeriesAppendStore {
    schema: Schema,
}

impl TimeSeriesAppendStore {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read the history at `path`. A missing file is an empty history.
    pub fn load(&self, path: &Path) -> Result<History, StoreError> {
        ensure_metrics_described();
        let rows = read_rows(&self.schema, path).inspect_err(|e| {
            if matches!(e, StoreError::MalformedHistory { .. }) {
                counter!("store_malformed_total").increment(1);
            }
        })?;
        Ok(History::new(self.schema.clone(), rows))
    }

    /// Merge `new_rows` into the history at `path` and return the full result.
    ///
    /// With no new rows nothing is written and the current history is returned.
    /// On any error the file on disk is left as it was.
    pub fn merge_and_persist(
        &self,
        new_rows: &[Observation],
        key_columns: &[&str],
        path: &Path,
    ) -> Result<History, StoreError> {
        self.check_key(key_columns)?;
        for (index, row) in new_rows.iter().enumerate() {
            self.schema
                .check_observation(row)
                .map_err(|reason| StoreError::InvalidObservation { index, reason })?;
        }

        let existing = self.load(path)?;
        if new_rows.is_empty() {
            tracing::debug!(target: "store", path = %path.display(), rows = existing.len(), "no new rows; history unchanged");
            return Ok(existing);
        }

        let existing_len = existing.len();
        let merged = dedup_last_wins(
            existing.into_rows().into_iter().chain(new_rows.iter().cloned()),
            key_columns,
        );

        let bytes = encode_csv(&self.schema, &merged)
            .map_err(|source| StoreError::Persist {
                path: path.to_path_buf(),
                source,
            })?;
        write_atomic(path, &bytes)?;

        counter!("store_merges_total").increment(1);
        counter!("store_rows_written_total").increment(merged.len() as u64);
        tracing::info!(
            target: "store",
            path = %path.display(),
            existing = existing_len,
            new = new_rows.len(),
            rows = merged.len(),
            "history merged"
        );

        Ok(History::new(self.schema.clone(), merged))
    }

    fn check_key(&self, key_columns: &[&str]) -> Result<(), StoreError> {
        if key_columns.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        match key_columns.iter().find(|k| self.schema.column(k).is_none()) {
            Some(k) => Err(StoreError::UnknownKeyColumn(k.to_string())),
            None => Ok(()),
        }
    }
}

/// Keep the last row per key; each surviving row sits where its key first appeared.
pub fn dedup_last_wins(
    rows: impl IntoIterator<Item = Observation>,
    key_columns: &[&str],
) -> Vec<Observation> {
    let mut slot_of: HashMap<Vec<String>, usize> = HashMap::new();
    let mut out: Vec<Observation> = Vec::new();
    for row in rows {
        let key: Vec<String> = key_columns
            .iter()
            .map(|c| row.get(c).map(Value::to_string).unwrap_or_default())
            .collect();
        match slot_of.get(&key) {
            Some(&i) => out[i] = row,
            None => {
                slot_of.insert(key, out.len());
                out.push(row);
            }
        }
    }
    out
}

fn read_rows(schema: &Schema, path: &Path) -> Result<Vec<Observation>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.is_empty() {
        return Err(StoreError::malformed(path, "file is empty (no header row)"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let header = reader
        .headers()
        .map_err(|e| StoreError::malformed(path, e.to_string()))?
        .clone();
    let positions = schema
        .header_positions(&header)
        .map_err(|reason| StoreError::malformed(path, reason))?;

    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        // header is line 1
        let line = n + 2;
        let record =
            record.map_err(|e| StoreError::malformed(path, format!("line {line}: {e}")))?;
        let mut obs = Observation::new();
        for (col, &pos) in schema.columns().iter().zip(&positions) {
            let raw = record.get(pos).unwrap_or_default();
            let value = Value::parse(col.kind, raw).map_err(|reason| {
                StoreError::malformed(path, format!("line {line}, column `{}`: {reason}", col.name))
            })?;
            obs = obs.with(col.name.clone(), value);
        }
        rows.push(obs);
    }
    Ok(rows)
}

fn encode_csv(schema: &Schema, rows: &[Observation]) -> std::io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.names())?;
    for row in rows {
        writer.write_record(schema.columns().iter().map(|c| {
            row.get(&c.name).map(Value::to_string).unwrap_or_default()
        }))?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

/// Replace `path` with `bytes`: write a sibling temp file, fsync, rename over.
/// The previous contents survive any failure. An existing file keeps its
/// permissions; a new one gets 0644 on unix.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let persist_err = |source: std::io::Error| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(persist_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
    let mode = match std::fs::metadata(path) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions()),
        Err(_) => set_new_file_mode(tmp.as_file()),
    };
    mode.map_err(persist_err)?;
    tmp.write_all(bytes).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_new_file_mode(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, v: f64) -> Observation {
        Observation::new().with("date", date).with("v", v)
    }

    #[test]
    fn dedup_keeps_first_position_last_value() {
        let rows = vec![row("a", 1.0), row("b", 2.0), row("a", 3.0), row("c", 4.0), row("b", 5.0)];
        let out = dedup_last_wins(rows, &["date"]);
        assert_eq!(out, vec![row("a", 3.0), row("b", 5.0), row("c", 4.0)]);
    }

    #[test]
    fn dedup_on_compound_key() {
        let mk = |d: &str, c: &str, v: f64| {
            Observation::new().with("date", d).with("category", c).with("v", v)
        };
        let rows = vec![mk("d1", "FII", 1.0), mk("d1", "DII", 2.0), mk("d1", "FII", 9.0)];
        let out = dedup_last_wins(rows, &["date", "category"]);
        assert_eq!(out, vec![mk("d1", "FII", 9.0), mk("d1", "DII", 2.0)]);
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("f.csv");
        write_atomic(&p, b"one").unwrap();
        write_atomic(&p, b"two").unwrap();
        assert_eq!(std::fs::read(&p).unwrap(), b"two");
        // no temp files left behind
        assert_eq!(std::fs::read_dir(p.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn failed_rename_leaves_target_and_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be renamed over
        let target = dir.path().join("data.csv");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"old").unwrap();

        let err = write_atomic(&target, b"new").unwrap_err();
        assert!(matches!(err, StoreError::Persist { ref path, .. } if path == &target), "{err}");
        assert_eq!(std::fs::read(target.join("keep.txt")).unwrap(), b"old");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    mod permissions {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn mode(p: &Path) -> u32 {
            std::fs::metadata(p).unwrap().permissions().mode() & 0o777
        }

        #[test]
        fn new_file_is_world_readable() {
            let dir = tempfile::tempdir().unwrap();
            let p = dir.path().join("f.csv");
            write_atomic(&p, b"x").unwrap();
            assert_eq!(mode(&p), 0o644);
        }

        #[test]
        fn existing_mode_is_kept() {
            let dir = tempfile::tempdir().unwrap();
            let p = dir.path().join("f.csv");
            for m in [0o644, 0o640, 0o664] {
                std::fs::write(&p, b"old").unwrap();
                std::fs::set_permissions(&p, std::fs::Permissions::from_mode(m)).unwrap();
                write_atomic(&p, b"new").unwrap();
                assert_eq!(mode(&p), m);
                assert_eq!(std::fs::read(&p).unwrap(), b"new");
            }
        }
    }
}
