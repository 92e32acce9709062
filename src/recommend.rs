//! Recommendation Engine: joins the cleaned tables and ranks matches.
//!
//! The query pipeline:
//! 1. inner join ratings and books on ISBN;
//! 2. keep rows whose title contains the search word as a whole word,
//!    case-insensitive (the term itself is escaped, so regex
//!    metacharacters in user input are matched literally);
//! 3. sum ratings per ISBN in first-seen order;
//! 4. stable top-5 by summed rating;
//! 5. pull display attributes back from the first contributing row;
//! 6. replace empty cells with [`MISSING_MARKER`] and rename `-` to `_`
//!    in the output headers.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::info;
use regex::RegexBuilder;

use crate::{
    cli::{DatasetKind, RecommendArgs},
    dataset::{DataTable, ISBN_COLUMN, RATING_COLUMN, TITLE_COLUMN},
    error::PipelineError,
    io_utils, repair, table,
};

pub const TOP_RECOMMENDATIONS: usize = 5;
pub const MISSING_MARKER: &str = "N/A";

pub fn execute(args: &RecommendArgs) -> Result<()> {
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_DELIMITER);
    let encoding = io_utils::resolve_input_encoding(args.input_encoding.as_deref())?;

    // Both exports must exist before anything is touched.
    for path in [&args.ratings, &args.books] {
        if !path.exists() {
            return Err(PipelineError::DataUnavailable(path.clone()).into());
        }
    }

    repair::repair_file(&args.ratings, delimiter, encoding, None)
        .with_context(|| format!("Repairing {:?}", args.ratings))?;
    repair::repair_file(&args.books, delimiter, encoding, None)
        .with_context(|| format!("Repairing {:?}", args.books))?;

    let mut ratings = DataTable::load_path(&args.ratings, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", args.ratings))?;
    ratings.repair(DatasetKind::Ratings)?;

    let mut books = DataTable::load_path(&args.books, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", args.books))?;
    books.repair(DatasetKind::Books)?;

    let result = filter_books(&ratings, &books, &args.word)?;
    info!("Finally found {} row(s)", result.rows.len());

    if args.table {
        table::print_table(&result.headers, &result.rows);
    } else if args.json {
        write_json(args.output.as_deref(), &result)?;
    } else {
        io_utils::write_table(args.output.as_deref(), delimiter, &result.headers, &result.rows)
            .context("Writing recommendation result")?;
    }
    Ok(())
}

/// Returns the top rated books whose titles contain `word` as a whole
/// word. At most [`TOP_RECOMMENDATIONS`] rows, unique by ISBN, ordered by
/// descending summed rating with ties kept in first-seen order. An empty
/// result is a valid outcome, not an error.
pub fn filter_books(ratings: &DataTable, books: &DataTable, word: &str) -> Result<DataTable> {
    let rating_isbn = ratings.column_index(ISBN_COLUMN)?;
    let rating_value = ratings.column_index(RATING_COLUMN)?;
    let book_isbn = books.column_index(ISBN_COLUMN)?;
    let book_title = books.column_index(TITLE_COLUMN)?;

    // Joined layout: all rating columns, then book columns minus ISBN.
    let book_columns = (0..books.headers.len())
        .filter(|idx| *idx != book_isbn)
        .collect::<Vec<_>>();
    let mut headers = ratings.headers.clone();
    headers.extend(book_columns.iter().map(|idx| books.headers[*idx].clone()));
    let display_headers = headers
        .iter()
        .map(|name| name.replace('-', "_"))
        .collect::<Vec<_>>();

    let trimmed = word.trim();
    if trimmed.is_empty() {
        return Ok(DataTable {
            headers: display_headers,
            rows: Vec::new(),
        });
    }
    let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(trimmed)))
        .case_insensitive(true)
        .build()
        .context("Compiling title search pattern")?;

    let mut lookup: HashMap<&str, &Vec<String>> = HashMap::new();
    for row in &books.rows {
        lookup.entry(row[book_isbn].as_str()).or_insert(row);
    }

    // Inner join plus title filter in one pass over the ratings.
    let mut matched: Vec<Vec<String>> = Vec::new();
    for row in &ratings.rows {
        let Some(book) = lookup.get(row[rating_isbn].as_str()) else {
            continue;
        };
        let title = &book[book_title];
        if title.is_empty() || !pattern.is_match(title) {
            continue;
        }
        let mut combined = row.clone();
        combined.extend(book_columns.iter().map(|idx| book[*idx].clone()));
        matched.push(combined);
    }

    // Sum ratings per ISBN, preserving first-seen group order.
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for row in &matched {
        let isbn = row[rating_isbn].as_str();
        let value = row[rating_value].trim().parse::<f64>().unwrap_or(0.0);
        if !sums.contains_key(isbn) {
            order.push(isbn);
        }
        *sums.entry(isbn).or_insert(0.0) += value;
    }

    let mut ranked = order
        .iter()
        .map(|isbn| (*isbn, sums[isbn]))
        .collect::<Vec<_>>();
    // Stable sort keeps first-seen order among equal sums.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(TOP_RECOMMENDATIONS);

    let mut rows = Vec::with_capacity(ranked.len());
    for (isbn, sum) in &ranked {
        let source = matched
            .iter()
            .find(|row| row[rating_isbn] == *isbn)
            .expect("ranked key came from matched rows");
        let mut row = source.clone();
        row[rating_value] = format_rating(*sum);
        for cell in &mut row {
            if cell.is_empty() {
                *cell = MISSING_MARKER.to_string();
            }
        }
        rows.push(row);
    }

    Ok(DataTable {
        headers: display_headers,
        rows,
    })
}

/// Whole sums print without a decimal point, fractional ones as-is.
fn format_rating(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn write_json(path: Option<&std::path::Path>, result: &DataTable) -> Result<()> {
    let rows = result
        .rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for (header, value) in result.headers.iter().zip(row) {
                object.insert(header.clone(), serde_json::Value::String(value.clone()));
            }
            serde_json::Value::Object(object)
        })
        .collect::<Vec<_>>();
    let payload = serde_json::Value::Array(rows);
    match path {
        Some(p) => {
            let file = std::fs::File::create(p).with_context(|| format!("Creating {p:?}"))?;
            serde_json::to_writer_pretty(file, &payload).context("Writing JSON result")?;
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &payload)
                .context("Writing JSON result")?;
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(rows: &[(&str, &str)]) -> DataTable {
        DataTable {
            headers: vec![ISBN_COLUMN.to_string(), RATING_COLUMN.to_string()],
            rows: rows
                .iter()
                .map(|(isbn, rating)| vec![isbn.to_string(), rating.to_string()])
                .collect(),
        }
    }

    fn books(rows: &[(&str, &str, &str)]) -> DataTable {
        DataTable {
            headers: vec![
                ISBN_COLUMN.to_string(),
                TITLE_COLUMN.to_string(),
                "Book-Author".to_string(),
            ],
            rows: rows
                .iter()
                .map(|(isbn, title, author)| {
                    vec![isbn.to_string(), title.to_string(), author.to_string()]
                })
                .collect(),
        }
    }

    #[test]
    fn filter_books_sums_ratings_and_respects_word_boundaries() {
        let ratings = ratings(&[("A1", "5"), ("A1", "3"), ("B2", "9")]);
        let books = books(&[
            ("A1", "The Cat", "Jane Doe"),
            ("B2", "Category", "John Roe"),
        ]);
        let result = filter_books(&ratings, &books, "cat").expect("filter");
        assert_eq!(result.headers, vec!["ISBN", "Book_Rating", "Book_Title", "Book_Author"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "A1");
        assert_eq!(result.rows[0][1], "8");
        assert_eq!(result.rows[0][2], "The Cat");
    }

    #[test]
    fn filter_books_caps_results_and_orders_by_sum() {
        let pairs = [
            ("A1", "1"),
            ("B2", "2"),
            ("C3", "3"),
            ("D4", "4"),
            ("E5", "5"),
            ("F6", "6"),
        ];
        let ratings = ratings(&pairs);
        let book_rows = pairs
            .iter()
            .map(|(isbn, _)| (*isbn, "Sea Stories", "Anon"))
            .collect::<Vec<_>>();
        let books = books(&book_rows);

        let result = filter_books(&ratings, &books, "sea").expect("filter");
        assert_eq!(result.rows.len(), TOP_RECOMMENDATIONS);
        let sums = result
            .rows
            .iter()
            .map(|row| row[1].parse::<f64>().unwrap())
            .collect::<Vec<_>>();
        assert!(sums.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(result.rows[0][0], "F6");
    }

    #[test]
    fn filter_books_breaks_ties_in_first_seen_order() {
        let ratings = ratings(&[("B2", "4"), ("A1", "4")]);
        let books = books(&[("A1", "Tied Tale", "X"), ("B2", "Tied Tale", "Y")]);
        let result = filter_books(&ratings, &books, "tied").expect("filter");
        assert_eq!(result.rows[0][0], "B2");
        assert_eq!(result.rows[1][0], "A1");
    }

    #[test]
    fn filter_books_with_blank_word_is_empty() {
        let ratings = ratings(&[("A1", "5")]);
        let books = books(&[("A1", "Anything", "X")]);
        let result = filter_books(&ratings, &books, "   ").expect("filter");
        assert!(result.rows.is_empty());
        assert_eq!(result.headers[1], "Book_Rating");
    }

    #[test]
    fn filter_books_treats_regex_metacharacters_literally() {
        let ratings = ratings(&[("A1", "5")]);
        let books = books(&[("A1", "The Cat", "X")]);
        // Unescaped, "c.t" would match "Cat"; the escaped term must not.
        let dotted = filter_books(&ratings, &books, "c.t").expect("filter");
        assert!(dotted.rows.is_empty());
        // A term that would be an invalid pattern fails gracefully, not fatally.
        let unbalanced = filter_books(&ratings, &books, "(cat").expect("filter");
        assert!(unbalanced.rows.is_empty());
    }

    #[test]
    fn filter_books_fills_missing_display_values() {
        let ratings = ratings(&[("A1", "5")]);
        let books = books(&[("A1", "The Cat", "")]);
        let result = filter_books(&ratings, &books, "cat").expect("filter");
        assert_eq!(result.rows[0][3], MISSING_MARKER);
    }

    #[test]
    fn filter_books_excludes_unmatched_isbns() {
        let ratings = ratings(&[("A1", "5"), ("ZZ", "9")]);
        let books = books(&[("A1", "The Cat", "X")]);
        let result = filter_books(&ratings, &books, "cat").expect("filter");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "A1");
    }
}
