#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    /// Writes raw bytes, for fixtures in legacy encodings.
    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// A small semicolon-delimited books export with one torn row (the comma
/// split "Title; with semicolon" across cells) and one column-shifted row.
pub fn sample_books() -> &'static str {
    concat!(
        "\"ISBN\";\"Book-Title\";\"Book-Author\";\"Year-Of-Publication\";\"Publisher\"\n",
        "\"0195153448\";\"Classical Mythology\";\"Mark Morford\";\"2002\";\"Oxford University Press\"\n",
        "\"0440234743\";\"The Cat\";\"Jane Doe\";\"1999\";\"Dell\"\n",
        "\"0452264464\";\"Category Theory\";\"John Roe\";\"2001\";\"Plume\"\n",
        "\"0887841740\";\"Torn; Title, fragment\";\"A. Nother\";\"1996\";\"House\"\n",
        "\"0771074670\";\"Shifted Book\";\"Stray Field\";\"Real Author\";\"1987\"\n",
    )
}

/// Matching ratings export, including zero and junk ratings.
pub fn sample_ratings() -> &'static str {
    concat!(
        "\"ISBN\";\"Book-Rating\"\n",
        "\"0440234743\";\"5\"\n",
        "\"0440234743\";\"3\"\n",
        "\"0452264464\";\"0\"\n",
        "\"0195153448\";\"8\"\n",
        "\"0887841740\";\"junk\"\n",
    )
}
