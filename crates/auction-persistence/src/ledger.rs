//! JSON Lines settlement ledger.
//!
//! Uses JSON Lines format (.jsonl), one settlement record per line:
//! - Files are opened in append mode and never truncated
//! - A torn write only damages its own line
//! - Every record is flushed before `append` returns
//!
//! Files rotate daily as `settlements_YYYY-MM-DD.jsonl`.

use crate::error::PersistenceResult;
use auction_core::SettlementRecord;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FILE_PREFIX: &str = "settlements_";
const FILE_SUFFIX: &str = ".jsonl";

/// Active writer state for daily file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// Append-only settlement ledger.
pub struct SettlementLedger {
    base_dir: PathBuf,
    active_writer: Option<ActiveWriter>,
}

impl SettlementLedger {
    /// Open the ledger directory, creating it if needed.
    pub fn open(base_dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            active_writer: None,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, record: &SettlementRecord) -> PersistenceResult<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();

        let needs_rotation = self
            .active_writer
            .as_ref()
            .is_some_and(|w| w.date != today);
        if needs_rotation {
            self.close_active_writer();
        }

        let active = match self.active_writer.take() {
            Some(active) => self.active_writer.insert(active),
            None => {
                let active = self.create_writer(&today)?;
                self.active_writer.insert(active)
            }
        };

        let json = serde_json::to_string(record)?;
        writeln!(active.writer, "{json}")?;
        active.writer.flush()?;
        active.records_written += 1;

        debug!(
            tx_hash = %record.tx_hash,
            auction_id = record.auction_id,
            date = %active.date,
            "Settlement recorded"
        );
        Ok(())
    }

    /// Read every record in the ledger directory, oldest file first.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub fn read_all(&self) -> PersistenceResult<Vec<SettlementRecord>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_ledger_file(path))
            .collect();
        files.sort();

        let mut records = Vec::new();
        for path in files {
            let reader = BufReader::new(File::open(&path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<SettlementRecord>(&line) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(
                        file = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping corrupt ledger line"
                    ),
                }
            }
        }
        Ok(records)
    }

    /// Flush and close the current file.
    pub fn close(&mut self) {
        self.close_active_writer();
    }

    fn create_writer(&self, date: &str) -> PersistenceResult<ActiveWriter> {
        let path = self.base_dir.join(format!("{FILE_PREFIX}{date}{FILE_SUFFIX}"));
        info!(path = %path.display(), "Opening settlement ledger (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        })
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "Failed to flush ledger on close");
            }
            info!(
                date = %active.date,
                records = active.records_written,
                "Closed settlement ledger"
            );
        }
    }
}

impl Drop for SettlementLedger {
    fn drop(&mut self) {
        self.close_active_writer();
    }
}

fn is_ledger_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
}
