//! Generic catalog CSV parser.
//!
//! Provides a streaming parser for the NAMASTE and ICD-11 CSV exports.
//! Columns are addressed by name, not position, because the exports of the
//! different catalogs order and name their columns differently.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::types::{CatalogConfig, CatalogError, CatalogResult};

/// Normalizes a header cell to its lookup name.
///
/// Trims, replaces spaces and colons with underscores and lowercases, so
/// `"Name English"` and `"name_english"` address the same column.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .replace([' ', ':'], "_")
        .to_lowercase()
}

/// Column positions of a parsed header row, keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    positions: HashMap<String, usize>,
}

impl HeaderMap {
    /// Builds the map from a raw header record. The first occurrence of a
    /// duplicated name wins.
    pub fn from_headers(headers: &StringRecord) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            positions.entry(normalize_header(name)).or_insert(i);
        }
        Self { positions }
    }

    /// Returns the position of a column.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    /// Returns true if the column exists.
    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }
}

/// One data row with name-based field access.
pub struct Row<'a> {
    record: &'a StringRecord,
    headers: &'a HeaderMap,
}

impl<'a> Row<'a> {
    /// Creates a row view.
    pub fn new(record: &'a StringRecord, headers: &'a HeaderMap) -> Self {
        Self { record, headers }
    }

    /// 1-based line of the row in its file, or 0 if unknown.
    pub fn line(&self) -> u64 {
        self.record.position().map_or(0, |p| p.line())
    }

    /// Returns the raw field value, or `None` if the column is absent.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.headers
            .position(column)
            .and_then(|i| self.record.get(i))
    }

    /// Returns the value of a required column (empty string for short rows).
    pub fn required(&self, column: &str) -> CatalogResult<&'a str> {
        match self.headers.position(column) {
            Some(i) => Ok(self.record.get(i).unwrap_or("")),
            None => Err(CatalogError::MissingColumn {
                column: column.to_string(),
            }),
        }
    }

    /// Returns the value of an optional column, treating blank cells as absent.
    pub fn optional(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    }

    /// Returns the first non-blank value among several candidate columns.
    pub fn first_of(&self, columns: &[&str]) -> Option<String> {
        columns.iter().find_map(|c| self.optional(c))
    }
}

/// Trait for types that can be parsed from catalog rows.
///
/// `Layout` carries whatever a record type needs to know about the file it
/// is read from (for source terms, which NAMASTE system the file belongs to).
pub trait CatalogRecord: Sized {
    /// Per-file parsing context.
    type Layout: Clone;

    /// Normalized names of the columns that must be present.
    fn required_columns(layout: &Self::Layout) -> &'static [&'static str];

    /// Parse a record from a data row.
    fn from_row(row: &Row<'_>, layout: &Self::Layout) -> CatalogResult<Self>;

    /// Returns true if this record passes the given filter config.
    fn passes_filter(&self, config: &CatalogConfig) -> bool;
}

/// A streaming parser for catalog CSV files.
pub struct CatalogParser<R: Read, T: CatalogRecord> {
    reader: Reader<R>,
    headers: HeaderMap,
    layout: T::Layout,
    config: CatalogConfig,
    records_read: usize,
    _marker: PhantomData<T>,
}

impl<T: CatalogRecord> CatalogParser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or lacks required columns.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        layout: T::Layout,
        config: CatalogConfig,
    ) -> CatalogResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CatalogError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), layout, config)
    }
}

impl<R: Read, T: CatalogRecord> CatalogParser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R, layout: T::Layout, config: CatalogConfig) -> CatalogResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let headers = HeaderMap::from_headers(csv_reader.headers()?);
        for column in T::required_columns(&layout) {
            if !headers.contains(column) {
                return Err(CatalogError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }

        Ok(Self {
            reader: csv_reader,
            headers,
            layout,
            config,
            records_read: 0,
            _marker: PhantomData,
        })
    }

    /// Returns the number of records read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Returns the parser configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Parses all records into a Vec, applying filters.
    ///
    /// Unlike iterating, this stops at the first malformed row.
    pub fn parse_all(self) -> CatalogResult<Vec<T>> {
        self.collect()
    }
}

impl<R: Read, T: CatalogRecord> Iterator for CatalogParser<R, T> {
    type Item = CatalogResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.records_read += 1;

                    // Skip empty records
                    if record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }

                    let row = Row::new(&record, &self.headers);
                    match T::from_row(&row, &self.layout) {
                        Ok(parsed) => {
                            if parsed.passes_filter(&self.config) {
                                return Some(Ok(parsed));
                            }
                            continue;
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
