//! I/O plumbing shared by the repair and load stages.
//!
//! The source exports this crate deals with are semicolon-delimited and
//! windows-1251 encoded, with quote characters that must be treated as
//! literal text. Readers built here therefore disable quote handling and
//! accept ragged record lengths; decoding goes through `encoding_rs`.
//! File rewrites never truncate in place: new content lands in a sibling
//! tempfile and is promoted with an atomic rename.

use std::{
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, WINDOWS_1251};
use tempfile::NamedTempFile;

pub const DEFAULT_DELIMITER: u8 = b';';

/// Resolves an encoding label, defaulting to the legacy windows-1251
/// encoding the exports were produced with.
pub fn resolve_input_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(WINDOWS_1251)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole file and decodes it in one shot.
pub fn read_decoded(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Reading input file {path:?}"))?;
    decode_bytes(&bytes, encoding)
}

/// Reader for repaired exports: fixed delimiter, literal quotes, ragged
/// record lengths tolerated so malformed rows can be skipped downstream.
pub fn open_literal_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .quoting(false)
        .flexible(true);
    builder.from_reader(reader)
}

/// Writes a cleaned table as UTF-8 CSV to a file or stdout.
pub fn write_table(
    path: Option<&Path>,
    delimiter: u8,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<()> {
    let out: Box<dyn Write> = match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        None => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(out);
    writer.write_record(headers).context("Writing headers")?;
    for row in rows {
        writer.write_record(row).context("Writing row")?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

/// Replaces `path` with `bytes` atomically: the content is written to a
/// tempfile in the same directory and renamed over the original, so
/// readers either see the old file or the new one, never a partial write.
pub fn atomic_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut temp = match dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .with_context(|| format!("Creating tempfile beside {path:?}"))?;
    temp.write_all(bytes)
        .with_context(|| format!("Writing repaired content for {path:?}"))?;
    temp.flush()?;
    temp.persist(path)
        .with_context(|| format!("Promoting repaired content over {path:?}"))?;
    Ok(())
}
