//! Table Loader, Cleaner, and Dataset Repairer.
//!
//! A [`DataTable`] is the stringly in-memory form of one source export:
//! header names on the first line, one `Vec<String>` per record. Loading
//! treats every quote character as literal text (the exports never use
//! CSV escaping on purpose), skips records that carry more fields than the
//! header, and pads records that carry fewer. Cleaning strips the stray
//! quote characters the repair stage leaves behind and canonicalizes the
//! ISBN join key to uppercase.
//!
//! [`DataTable::repair`] then applies the per-dataset pass: ratings rows
//! without a usable nonzero rating are dropped, and book rows whose
//! publication year is not numeric are treated as column-shifted and
//! realigned one position to the right.

use std::{io::Read, path::Path};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, info};

use crate::{cli::DatasetKind, error::PipelineError, io_utils, repair};

pub const ISBN_COLUMN: &str = "ISBN";
pub const RATING_COLUMN: &str = "Book-Rating";
pub const TITLE_COLUMN: &str = "Book-Title";
pub const AUTHOR_COLUMN: &str = "Book-Author";
pub const YEAR_COLUMN: &str = "Year-Of-Publication";

#[derive(Debug, Clone)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Parses an already-repaired export from `reader`.
    pub fn load(reader: impl Read, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut csv_reader = io_utils::open_literal_reader(reader, delimiter);
        let mut records = csv_reader.byte_records();

        let header_record = records
            .next()
            .transpose()
            .context("Reading header line")?
            .context("Input has no header line")?;
        let headers = io_utils::decode_record(&header_record, encoding)?
            .into_iter()
            .map(|name| clean_header(&name))
            .collect::<Vec<_>>();

        let isbn_index = headers.iter().position(|h| h == ISBN_COLUMN);
        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for (idx, record) in records.enumerate() {
            let record = record.with_context(|| format!("Reading line {}", idx + 2))?;
            if record.len() > headers.len() {
                debug!("Skipping malformed line {} ({} fields)", idx + 2, record.len());
                skipped += 1;
                continue;
            }
            let mut row = io_utils::decode_record(&record, encoding)?
                .into_iter()
                .map(|value| clean_value(&value))
                .collect::<Vec<_>>();
            row.resize(headers.len(), String::new());
            if let Some(isbn) = isbn_index {
                row[isbn] = row[isbn].to_uppercase();
            }
            rows.push(row);
        }
        if skipped > 0 {
            debug!("Skipped {skipped} malformed line(s)");
        }
        Ok(Self { headers, rows })
    }

    /// Loads an export from disk, assuming its lines were already repaired.
    pub fn load_path(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let reader = std::io::BufReader::new(
            std::fs::File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        );
        Self::load(reader, delimiter, encoding)
    }

    /// Loads an export from disk, running the line repair in memory first.
    /// The file itself is left untouched.
    pub fn load_repaired(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let text = io_utils::read_decoded(path, encoding)?;
        let repaired = repair::repair_content(&text, delimiter)?;
        Self::load(repaired.content.as_bytes(), delimiter, UTF_8)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()).into())
    }

    /// Applies the dataset-specific repair pass.
    pub fn repair(&mut self, kind: DatasetKind) -> Result<()> {
        match kind {
            DatasetKind::Ratings => self.repair_ratings(),
            DatasetKind::Books => self.repair_books(),
        }
    }

    /// Drops rows whose rating is missing, non-numeric, or zero. Those
    /// rows carry no preference signal.
    fn repair_ratings(&mut self) -> Result<()> {
        let rating = self.column_index(RATING_COLUMN)?;
        let before = self.rows.len();
        self.rows
            .retain(|row| matches!(row[rating].trim().parse::<f64>(), Ok(value) if value != 0.0));
        info!(
            "Ratings dataset processed: {} row(s) kept, {} dropped",
            self.rows.len(),
            before - self.rows.len()
        );
        Ok(())
    }

    /// Dedups by ISBN, then realigns suspect rows. A row whose year field
    /// is not purely numeric picked up one extra field upstream, shifting
    /// every later column one position left; the repair shifts them back
    /// right from the column after the author and blanks the author cell.
    /// The heuristic is deliberately kept exactly this narrow.
    fn repair_books(&mut self) -> Result<()> {
        let isbn = self.column_index(ISBN_COLUMN)?;
        let author = self.column_index(AUTHOR_COLUMN)?;
        let year = self.column_index(YEAR_COLUMN)?;
        let width = self.headers.len();

        let deduped = std::mem::take(&mut self.rows)
            .into_iter()
            .unique_by(|row| row[isbn].clone())
            .collect::<Vec<_>>();
        let total = deduped.len();

        let (valid, suspects): (Vec<_>, Vec<_>) = deduped
            .into_iter()
            .partition(|row| is_numeric(&row[year]));

        let mut repaired = suspects;
        for row in &mut repaired {
            for col in (author + 1..width).rev() {
                row[col] = row[col - 1].clone();
            }
            row[author].clear();
        }
        info!("Shifted {} suspect book row(s)", repaired.len());

        self.rows = valid;
        self.rows.extend(repaired);
        debug_assert_eq!(self.rows.len(), total);
        info!("Books dataset processed: {} row(s)", self.rows.len());
        Ok(())
    }
}

fn clean_header(name: &str) -> String {
    name.replace(['"', ','], "")
}

fn clean_value(value: &str) -> String {
    value.replace('"', "")
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
