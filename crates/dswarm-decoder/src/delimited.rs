//! Delimited text decoder: one record per row, one literal per non-empty cell

use crate::Decoder;
use dswarm_core::{DecodeError, PipelineResult, StreamReceiver};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FORMAT: &str = "csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// First row names the columns; otherwise columns are `column1`, `column2`, …
    pub has_headers: bool,
    /// Column holding the record id; rows fall back to their 1-based ordinal
    pub id_column: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            id_column: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvDecoder {
    options: CsvOptions,
}

impl CsvDecoder {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }
}

impl Decoder for CsvDecoder {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn can_handle(&self, input: &str) -> bool {
        let delimiter = char::from(self.options.delimiter);
        input
            .lines()
            .next()
            .is_some_and(|first| first.contains(delimiter))
    }

    fn decode(&self, input: &str, receiver: &mut dyn StreamReceiver) -> PipelineResult<usize> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(self.options.has_headers)
            .from_reader(input.as_bytes());

        let headers: Vec<String> = if self.options.has_headers {
            reader
                .headers()
                .map_err(|e| DecodeError::malformed(FORMAT, e))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let id_index = match &self.options.id_column {
            Some(column) => Some(headers.iter().position(|h| h == column).ok_or_else(|| {
                DecodeError::malformed(FORMAT, format!("no id column '{column}' in header"))
            })?),
            None => None,
        };

        let mut count = 0;
        for row in reader.records() {
            let row = row.map_err(|e| DecodeError::malformed(FORMAT, e))?;
            count += 1;

            let id = id_index
                .and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map_or_else(|| count.to_string(), str::to_string);

            receiver.start_record(&id)?;
            for (i, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                match headers.get(i) {
                    Some(name) => receiver.literal(name, cell)?,
                    None => receiver.literal(&format!("column{}", i + 1), cell)?,
                }
            }
            receiver.end_record()?;
        }

        debug!(records = count, "decoded delimited document");
        Ok(count)
    }

    fn priority(&self) -> u8 {
        10
    }
}
