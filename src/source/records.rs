//! The append-only CSV record source.
//!
//! Rows are arrival-ordered; the last row is the latest reading. The file is
//! written by an external recorder and, for simulation requests, by this
//! process. All access from this process goes through one mutex so a poll
//! never sees a half-written row and two appends never interleave.

use crate::core::BiometricSample;
use crate::error::StressError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const EDA_COLUMN: &str = "EDA";
pub const HR_COLUMN: &str = "HR";
pub const HRV_COLUMN: &str = "HRV";
pub const TEMP_COLUMN: &str = "TEMP";

/// Header written to new sources, in column order.
pub const HEADER: [&str; 4] = [EDA_COLUMN, HR_COLUMN, HRV_COLUMN, TEMP_COLUMN];

/// Rows written when the source has to be created: `(EDA, HR, HRV, TEMP)`.
pub const SEED_ROWS: [(f64, f64, f64, f64); 5] = [
    (0.25, 72.0, 48.0, 34.2),
    (0.30, 75.0, 45.0, 34.5),
    (0.35, 78.0, 42.0, 34.8),
    (0.28, 74.0, 46.0, 34.4),
    (0.32, 76.0, 44.0, 34.6),
];

/// The last record of the source, with any fields that fell back to defaults.
#[derive(Debug)]
pub struct LatestRecord {
    pub sample: BiometricSample,
    /// One `MalformedRecord` per field that was missing or unparseable
    pub defaulted: Vec<StressError>,
}

/// Outcome of [`RecordSource::ensure_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The source was already there
    Present,
    /// The source was missing and has been created with seed rows
    Seeded,
}

/// Handle to the CSV file the agent polls.
#[derive(Debug)]
pub struct RecordSource {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl RecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the source with seed rows if it does not exist.
    pub fn ensure_exists(&self) -> Result<SeedOutcome, StressError> {
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.path.exists() {
            return Ok(SeedOutcome::Present);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
        }

        // create_new: never clobber a file the external recorder just created
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(SeedOutcome::Present)
            }
            Err(e) => return Err(self.unavailable(e)),
        };

        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(HEADER)
            .map_err(|e| self.csv_error(e))?;
        for (eda, hr, hrv, temp) in SEED_ROWS {
            writer
                .write_record(format_row(&BiometricSample::new(eda, hr, hrv, temp)))
                .map_err(|e| self.csv_error(e))?;
        }
        writer.flush().map_err(|e| self.unavailable(e))?;

        tracing::info!(path = ?self.path, "Created seed record source");
        Ok(SeedOutcome::Seeded)
    }

    /// Read every record and return the last one.
    ///
    /// Missing columns, an empty body, or unparseable fields fall back to the
    /// per-field defaults. A missing file or a structurally broken CSV is an error.
    pub fn read_latest(&self) -> Result<LatestRecord, StressError> {
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());

        let file = File::open(&self.path).map_err(|e| self.unavailable(e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let columns = [
            column(EDA_COLUMN),
            column(HR_COLUMN),
            column(HRV_COLUMN),
            column(TEMP_COLUMN),
        ];

        let mut last = None;
        for record in reader.records() {
            last = Some(record.map_err(|e| self.csv_error(e))?);
        }

        let defaults = BiometricSample::default().features();
        let mut defaulted = Vec::new();
        let mut values = defaults;

        for (i, name) in HEADER.into_iter().enumerate() {
            let raw = match (&last, columns[i]) {
                (None, _) => Err("no records".to_string()),
                (Some(_), None) => Err("column missing".to_string()),
                (Some(record), Some(idx)) => match record.get(idx) {
                    None => Err("field missing".to_string()),
                    Some(s) => parse_finite(s),
                },
            };

            match raw {
                Ok(v) => values[i] = v,
                Err(reason) => defaulted.push(StressError::MalformedRecord {
                    field: name,
                    reason,
                }),
            }
        }

        let [eda, hr, hrv, temp] = values;
        Ok(LatestRecord {
            sample: BiometricSample::new(eda, hr, hrv, temp),
            defaulted,
        })
    }

    /// Append one record, creating the source with a header if needed.
    pub fn append(&self, sample: &BiometricSample) -> Result<(), StressError> {
        let _guard = self.io_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.append_error(e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.append_error(e))?;

        let len = file.metadata().map_err(|e| self.append_error(e))?.len();

        // Build the whole chunk first so it lands in a single write
        let mut chunk = Vec::new();
        if len > 0 && !ends_with_newline(&mut file).map_err(|e| self.append_error(e))? {
            chunk.push(b'\n');
        }
        {
            let mut writer = csv::Writer::from_writer(&mut chunk);
            if len == 0 {
                writer.write_record(HEADER).map_err(|e| self.append_error(e))?;
            }
            writer
                .write_record(format_row(sample))
                .map_err(|e| self.append_error(e))?;
            writer.flush().map_err(|e| self.append_error(e))?;
        }

        file.write_all(&chunk).map_err(|e| self.append_error(e))?;
        file.flush().map_err(|e| self.append_error(e))?;
        Ok(())
    }

    fn unavailable(&self, source: std::io::Error) -> StressError {
        StressError::SourceUnavailable {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StressError {
        StressError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn append_error(&self, e: impl std::fmt::Display) -> StressError {
        StressError::Append {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

/// Format a sample the way the recorder writes it: EDA 2dp, integer HR/HRV, TEMP 1dp.
fn format_row(sample: &BiometricSample) -> [String; 4] {
    [
        format!("{:.2}", sample.eda),
        format!("{}", sample.heart_rate.trunc() as i64),
        format!("{}", sample.heart_rate_variability.trunc() as i64),
        format!("{:.1}", sample.skin_temp),
    ]
}

fn parse_finite(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(v) => Err(format!("non-finite value {v}")),
        Err(_) if raw.is_empty() => Err("empty field".to_string()),
        Err(e) => Err(format!("{raw:?}: {e}")),
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
