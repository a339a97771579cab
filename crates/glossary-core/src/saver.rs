//! Saving search results to files
//!
//! The writer is picked from the file extension. xlsx, csv, json and txt are
//! registered by default; more can be added with [`Saver::register`].

use crate::{GlossaryError, Result, SearchResult};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column headers used by tabular formats
pub const HEADERS: [&str; 5] = ["Term", "Definition", "Grammatical Label", "Topic", "URL"];

/// Extension used when no file name is given
pub const DEFAULT_EXTENSION: &str = "txt";

/// Writes results in one file format
pub trait FormatWriter: Send + Sync {
    /// File extension handled, without the dot
    fn extension(&self) -> &str;

    /// Write `results`, found under `topic`, to `path`
    fn write(&self, topic: &str, results: &[SearchResult], path: &Path) -> Result<()>;
}

/// Dispatches results to the writer registered for a file's extension
pub struct Saver {
    writers: HashMap<String, Box<dyn FormatWriter>>,
}

impl Saver {
    /// A saver with no writers registered
    pub fn empty() -> Self {
        Self {
            writers: HashMap::new(),
        }
    }

    /// Register a writer, replacing any writer for the same extension
    pub fn register<W: FormatWriter + 'static>(&mut self, writer: W) -> &mut Self {
        self.writers
            .insert(writer.extension().to_lowercase(), Box::new(writer));
        self
    }

    /// Extensions that can be saved to, sorted
    pub fn supported_formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.writers.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// Save `results` to `filename`, or to `"<Topic> Glossary.txt"` when none is given.
    ///
    /// Returns the path written to.
    pub fn save(
        &self,
        topic: &str,
        results: &[SearchResult],
        filename: Option<&Path>,
    ) -> Result<PathBuf> {
        let extension = match filename {
            Some(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .ok_or_else(|| GlossaryError::UnsupportedFormat(path.display().to_string()))?,
            None => DEFAULT_EXTENSION.to_string(),
        };

        let writer = self
            .writers
            .get(&extension)
            .ok_or_else(|| GlossaryError::UnsupportedFormat(extension.clone()))?;

        let path = filename
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_filename(topic, &extension));
        writer.write(topic, results, &path)?;

        info!("Saved {} results to {:?}", results.len(), path);
        Ok(path)
    }
}

impl Default for Saver {
    fn default() -> Self {
        let mut saver = Self::empty();
        saver
            .register(XlsxWriter)
            .register(CsvWriter)
            .register(JsonWriter)
            .register(TxtWriter);
        saver
    }
}

/// `"<Topic> Glossary.<ext>"`
pub fn default_filename(topic: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{} Glossary.{}", title_case(topic), extension))
}

/// Uppercase letters that follow a non-letter, lowercase the rest
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(c);
            prev_letter = false;
        }
    }
    out
}

/// Reject a path whose extension is not `extension`
fn check_extension(path: &Path, extension: &str) -> Result<()> {
    let matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if !matches {
        return Err(GlossaryError::InvalidFilename(format!(
            "'{}' must end with .{}",
            path.display(),
            extension
        )));
    }
    Ok(())
}

/// Excel workbook with one sheet named after the topic
pub struct XlsxWriter;

impl XlsxWriter {
    /// Sheet names are limited to 31 characters and exclude `[]:*?/\`
    fn sheet_name(topic: &str) -> String {
        let name: String = title_case(topic)
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\' | '\''))
            .take(31)
            .collect();
        let name = name.trim();
        if name.is_empty() {
            "Glossary".to_string()
        } else {
            name.to_string()
        }
    }
}

impl FormatWriter for XlsxWriter {
    fn extension(&self) -> &str {
        "xlsx"
    }

    fn write(&self, topic: &str, results: &[SearchResult], path: &Path) -> Result<()> {
        check_extension(path, self.extension())?;

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(Self::sheet_name(topic))?;

        for (col, header) in HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (row, result) in results.iter().enumerate() {
            for (col, value) in result.to_record().iter().enumerate() {
                sheet.write_string(row as u32 + 1, col as u16, *value)?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// Comma separated values with a header row
pub struct CsvWriter;

impl FormatWriter for CsvWriter {
    fn extension(&self) -> &str {
        "csv"
    }

    fn write(&self, _topic: &str, results: &[SearchResult], path: &Path) -> Result<()> {
        check_extension(path, self.extension())?;

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADERS)?;
        for result in results {
            writer.write_record(result.to_record())?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Array of result objects, four-space indented
pub struct JsonWriter;

impl FormatWriter for JsonWriter {
    fn extension(&self) -> &str {
        "json"
    }

    fn write(&self, _topic: &str, results: &[SearchResult], path: &Path) -> Result<()> {
        check_extension(path, self.extension())?;

        let mut out = BufWriter::new(File::create(path)?);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        results.serialize(&mut serializer)?;
        out.flush()?;
        Ok(())
    }
}

/// Numbered plain text entries
pub struct TxtWriter;

impl FormatWriter for TxtWriter {
    fn extension(&self) -> &str {
        "txt"
    }

    fn write(&self, _topic: &str, results: &[SearchResult], path: &Path) -> Result<()> {
        check_extension(path, self.extension())?;

        let mut out = BufWriter::new(File::create(path)?);
        for (i, result) in results.iter().enumerate() {
            write!(
                out,
                "({}). {}:\n{}\n\n",
                i + 1,
                title_case(&result.term),
                result.definition.as_deref().unwrap_or("")
            )?;
        }
        out.flush()?;
        Ok(())
    }
}
