//! Record decoding
//!
//! Turns raw object bytes into rows keyed by column name. The first row of
//! the content is the header; every following row must have exactly as many
//! columns.

use std::collections::HashMap;
use thiserror::Error;

/// One decoded row: column name to raw string value
pub type Record = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Decodes object content into records
pub trait RecordDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Vec<Record>, DecodeError>;
}

/// Comma-separated values with a header row
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<Record>, DecodeError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(data);

        // A repeated column name keeps the value of its last occurrence
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(
                header
                    .iter()
                    .cloned()
                    .zip(row.iter().map(str::to_string))
                    .collect(),
            );
        }

        Ok(records)
    }
}
