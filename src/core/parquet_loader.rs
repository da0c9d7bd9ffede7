//! CSV to Parquet conversion.
//!
//! Every column is loaded as a nullable UTF-8 string column named after the
//! header row; no type inference is attempted.

use crate::core::{Result, Storage};
use crate::utils::error::OpsError;
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

pub const DEFAULT_DELIMITER: &str = "¦";
pub const DEFAULT_QUOTE: u8 = b'"';

/// Stand-in byte for delimiters the csv reader cannot take directly.
const UNIT_SEPARATOR: u8 = 0x1f;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub delimiter: String,
    pub quote: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            quote: DEFAULT_QUOTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Parse CSV text whose first row is the header. Rows shorter than the
/// header are padded with nulls; longer rows are rejected.
pub fn read_csv(content: &str, options: &CsvOptions) -> Result<CsvTable> {
    if options.delimiter.is_empty() {
        return Err(OpsError::ValidationError {
            message: "CSV delimiter must not be empty".to_string(),
        });
    }

    let (input, delimiter, substituted) = match options.delimiter.as_bytes() {
        [single] if single.is_ascii() => (content.to_string(), *single, false),
        _ => (
            content.replace(&options.delimiter, &(UNIT_SEPARATOR as char).to_string()),
            UNIT_SEPARATOR,
            true,
        ),
    };
    let restore = |field: &str| -> String {
        if substituted {
            field.replace(UNIT_SEPARATOR as char, &options.delimiter)
        } else {
            field.to_string()
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(options.quote)
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(restore).collect();
    if header.is_empty() {
        return Err(OpsError::ValidationError {
            message: "CSV input has no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > header.len() {
            return Err(OpsError::ValidationError {
                message: format!(
                    "CSV row {} has {} fields but the header has {}",
                    index + 2,
                    record.len(),
                    header.len()
                ),
            });
        }

        let mut row: Vec<Option<String>> = record.iter().map(|f| Some(restore(f))).collect();
        row.resize(header.len(), None);
        rows.push(row);
    }

    Ok(CsvTable { header, rows })
}

pub fn to_record_batch(table: &CsvTable) -> Result<RecordBatch> {
    let schema = Schema::new(
        table
            .header
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );

    let columns: Vec<ArrayRef> = (0..table.header.len())
        .map(|col| {
            let values: StringArray = table
                .rows
                .iter()
                .map(|row| row[col].as_deref())
                .collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build()
}

pub fn write_parquet(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(writer_properties()))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buffer)
}

pub struct ParquetLoader<S: Storage> {
    storage: S,
    options: CsvOptions,
}

impl<S: Storage> ParquetLoader<S> {
    pub fn new(storage: S, options: CsvOptions) -> Self {
        Self { storage, options }
    }

    /// Convert CSV bytes and write the Parquet file to `destination`.
    /// Returns the number of data rows written.
    pub async fn load(&self, csv_bytes: &[u8], destination: &str) -> Result<usize> {
        let content = std::str::from_utf8(csv_bytes).map_err(|e| OpsError::ValidationError {
            message: format!("CSV input is not valid UTF-8: {}", e),
        })?;

        let table = read_csv(content, &self.options)?;
        tracing::debug!(
            "Parsed {} rows with columns {:?}",
            table.rows.len(),
            table.header
        );

        let batch = to_record_batch(&table)?;
        let bytes = write_parquet(&batch)?;
        self.storage.write_file(destination, &bytes).await?;

        tracing::info!(
            "Parquet file with {} rows ({} bytes) written to {}",
            batch.num_rows(),
            bytes.len(),
            destination
        );
        Ok(batch.num_rows())
    }
}
