use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Repair and rank messy book-rating CSV exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collapse malformed rows of a delimited export into one logical field per record
    Repair(RepairArgs),
    /// Repair, load, and clean a single dataset, writing it back out as UTF-8 CSV
    Clean(CleanArgs),
    /// Recommend the top rated books whose titles contain a search word
    Recommend(RecommendArgs),
}

/// Which of the two source exports a file contains. Threaded explicitly
/// instead of sniffing the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum DatasetKind {
    Ratings,
    Books,
}

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// File to repair
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Write repaired content here instead of replacing the input atomically
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Field separator character (supports ';', ',', 'tab', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the file (defaults to windows-1251)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// File to clean
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Dataset kind contained in the file
    #[arg(short, long, value_enum)]
    pub kind: DatasetKind,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Field separator character (supports ';', ',', 'tab', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to windows-1251)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Books export (ISBN;Book-Title;Book-Author;Year-Of-Publication;...)
    #[arg(short, long)]
    pub books: PathBuf,
    /// Ratings export (ISBN;Book-Rating;...)
    #[arg(short, long)]
    pub ratings: PathBuf,
    /// Word to search for in book titles
    #[arg(short, long)]
    pub word: String,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Field separator character (supports ';', ',', 'tab', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to windows-1251)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Render the result as an elastic table to stdout
    #[arg(long = "table", conflicts_with = "json")]
    pub table: bool,
    /// Emit the result as a JSON array of row objects
    #[arg(long = "json")]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
