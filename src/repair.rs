//! Line Repairer: first stage of the pipeline.
//!
//! The source exports are semicolon-delimited, but the separator also
//! appears inside unquoted free-text fields (book titles), so an upstream
//! comma-oriented tool has split many physical lines into misaligned
//! cells. This stage collapses each record back into a single logical
//! field: all non-empty cells are space-joined, the first separator in the
//! joined string is kept as the structural boundary, and every later
//! separator is removed unless the character right before it is a digit or
//! a double quote (which marks a genuine field boundary in these exports).
//!
//! Repairing is a fixed point: running it over an already repaired file
//! leaves the content unchanged.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::io_utils;

pub struct RepairSummary {
    pub records: usize,
    pub collapsed: usize,
    pub destination: PathBuf,
}

pub struct RepairedContent {
    pub content: String,
    pub records: usize,
    pub collapsed: usize,
}

/// Rewrites `text` so that each record past the header is one logical
/// field. Cells are parsed with a comma delimiter and standard quote
/// handling, matching how the damage was introduced.
pub fn repair_content(text: &str, separator: u8) -> Result<RepairedContent> {
    // The header line passes through untouched; only data records are
    // re-parsed and collapsed.
    let (header, body) = match text.split_once('\n') {
        Some((header, body)) => (header.strip_suffix('\r').unwrap_or(header), body),
        None => (text, ""),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .from_writer(Vec::new());

    let sep = separator as char;
    let mut records = 0usize;
    let mut collapsed = 0usize;

    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading line {}", idx + 2))?;
        let joined = join_cells(&record);
        if joined.is_empty() {
            // An all-blank record would round-trip as a blank line the
            // reader skips, so it is dropped outright.
            debug!("Dropping blank record at line {}", idx + 2);
            continue;
        }
        let repaired = collapse_row(&joined, sep);
        if record.len() > 1 || repaired != joined {
            collapsed += 1;
        }
        records += 1;
        writer
            .write_record([repaired.as_str()])
            .with_context(|| format!("Writing line {}", idx + 2))?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Flushing repaired content: {err}"))?;
    let body = String::from_utf8(buffer).context("Repaired content is not valid UTF-8")?;
    let mut content = String::with_capacity(header.len() + 1 + body.len());
    content.push_str(header);
    content.push('\n');
    content.push_str(&body);
    Ok(RepairedContent {
        content,
        records,
        collapsed,
    })
}

/// Repairs a file on disk. With `output` unset the file is replaced
/// atomically; otherwise the repaired content goes to `output` and the
/// input is left untouched. Text is decoded from and re-encoded to
/// `encoding`.
pub fn repair_file(
    path: &Path,
    separator: u8,
    encoding: &'static Encoding,
    output: Option<&Path>,
) -> Result<RepairSummary> {
    let text = io_utils::read_decoded(path, encoding)?;
    let repaired = repair_content(&text, separator)?;
    let (bytes, _, _) = encoding.encode(&repaired.content);

    let destination = match output {
        Some(out) => {
            std::fs::write(out, &bytes).with_context(|| format!("Writing {out:?}"))?;
            out.to_path_buf()
        }
        None => {
            io_utils::atomic_replace(path, &bytes)?;
            path.to_path_buf()
        }
    };
    debug!(
        "Repair of {:?}: {} record(s), {} collapsed",
        path, repaired.records, repaired.collapsed
    );
    Ok(RepairSummary {
        records: repaired.records,
        collapsed: repaired.collapsed,
        destination,
    })
}

fn join_cells(record: &csv::StringRecord) -> String {
    record
        .iter()
        .filter(|cell| !cell.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keeps the first separator occurrence, then removes every later one
/// whose preceding character (in the unmodified string) is neither a
/// digit nor a double quote.
fn collapse_row(joined: &str, separator: char) -> String {
    let Some(idx) = joined.find(separator) else {
        return joined.to_string();
    };
    let boundary = idx + separator.len_utf8();
    let (head, tail) = joined.split_at(boundary);

    let mut out = String::with_capacity(joined.len());
    out.push_str(head);
    let mut prev: Option<char> = None;
    for ch in tail.chars() {
        let guarded = matches!(prev, Some(p) if p.is_ascii_digit() || p == '"');
        if ch != separator || guarded {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}
