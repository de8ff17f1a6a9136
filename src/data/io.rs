//! BOM-aware delimited text reading and atomic writing.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::{
    data::record::{ReviewRecord, Tabular, OUTPUT_COLUMNS},
    error::{PipelineError, Result},
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a raw review dump, checking that every required column is present.
pub fn load(source: &Path) -> Result<Vec<ReviewRecord>> {
    let rows: Vec<ReviewRecord> = read_rows(source, &OUTPUT_COLUMNS)?;
    info!(path = %source.display(), rows = rows.len(), "loaded raw reviews");
    Ok(rows)
}

/// Read any serde row type from a BOM-aware CSV file.
///
/// `required` lists header names that must be present; the file is rejected
/// with a schema error otherwise.
pub fn read_rows<T>(source: &Path, required: &[&str]) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let bytes = fs::read(source).map_err(|err| PipelineError::io(source, err))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(body);
    let headers = reader
        .headers()
        .map_err(|err| PipelineError::csv(source, err))?
        .clone();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "{} is missing required column(s): {}",
            source.display(),
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: T = result.map_err(|err| PipelineError::csv(source, err))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write rows with a leading BOM, going through a temporary sibling file so a
/// failed run never leaves truncated output at `destination`.
///
/// The header row is always written, even for an empty dataset.
pub fn save<T>(rows: &[T], destination: &Path) -> Result<()>
where
    T: Serialize + Tabular,
{
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
        }
    }

    let staging = staging_path(destination);
    let result = write_staged(rows, &staging).and_then(|()| {
        fs::rename(&staging, destination).map_err(|err| PipelineError::io(destination, err))
    });
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result?;

    info!(path = %destination.display(), rows = rows.len(), "saved dataset");
    Ok(())
}

fn write_staged<T>(rows: &[T], staging: &Path) -> Result<()>
where
    T: Serialize + Tabular,
{
    let mut file = fs::File::create(staging).map_err(|err| PipelineError::io(staging, err))?;
    file.write_all(UTF8_BOM)
        .map_err(|err| PipelineError::io(staging, err))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(T::COLUMNS)
        .map_err(|err| PipelineError::csv(staging, err))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| PipelineError::csv(staging, err))?;
    }
    writer
        .flush()
        .map_err(|err| PipelineError::io(staging, err))?;
    debug!(path = %staging.display(), "flushed staging file");
    Ok(())
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}
