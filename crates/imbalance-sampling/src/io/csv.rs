//! Delimited text reader and writer for labelled datasets.
//!
//! Non-numeric columns become nominal attributes; their values, and string
//! labels, are encoded as integer codes in order of first appearance. The code
//! tables travel in [`CsvMetadata`] so a resampled dataset can be written back
//! with the original names.
use std::collections::HashMap;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};
use anyhow::{anyhow, Context, Result};

use crate::data_handling::{Dataset, Label};

#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    pub delimiter: u8,
    pub has_headers: bool,
    /// Header name (or zero-based position without headers) of the label column.
    /// Defaults to the last column.
    pub label_column: Option<String>,
    /// Columns forced to nominal even when every value parses as a number.
    pub nominal_columns: Vec<String>,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            label_column: None,
            nominal_columns: Vec::new(),
        }
    }
}

/// Names and code tables needed to write a dataset back.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvMetadata {
    pub delimiter: u8,
    pub feature_names: Vec<String>,
    pub label_name: String,
    /// `label_codes[code]` is the original label; empty when labels were integers.
    pub label_codes: Vec<String>,
    /// Per attribute, `codes[value]` is the original nominal value; empty or missing for continuous attributes.
    pub nominal_codes: Vec<Vec<String>>,
}

impl CsvMetadata {
    pub fn label_name_of(&self, label: Label) -> String {
        usize::try_from(label)
            .ok()
            .and_then(|code| self.label_codes.get(code))
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    fn format_value(&self, feature: usize, value: f64) -> String {
        if value >= 0.0 && value.fract() == 0.0 {
            let name = self
                .nominal_codes
                .get(feature)
                .and_then(|codes| codes.get(value as usize));
            if let Some(name) = name {
                return name.clone();
            }
        }
        value.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct LabeledCsv {
    pub dataset: Dataset,
    pub metadata: CsvMetadata,
}

/// First-appearance encoder for string values.
#[derive(Default)]
struct CodeTable {
    index: HashMap<String, usize>,
    values: Vec<String>,
}

impl CodeTable {
    fn encode(&mut self, value: &str) -> usize {
        if let Some(&code) = self.index.get(value) {
            return code;
        }
        let code = self.values.len();
        self.index.insert(value.to_string(), code);
        self.values.push(value.to_string());
        code
    }
}

pub fn read_csv<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<LabeledCsv> {
    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.has_headers)
        .trim(::csv::Trim::All)
        .from_path(&path)
        .with_context(|| format!("Failed to open CSV file: {}", path.as_ref().display()))?;

    let headers = if config.has_headers {
        Some(reader.headers().context("Failed to read CSV header row")?.clone())
    } else {
        None
    };

    let mut records: Vec<StringRecord> = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        records.push(result.with_context(|| format!("Failed to read row {}", row_idx + 1))?);
    }

    let n_columns = match (&headers, records.first()) {
        (Some(h), _) => h.len(),
        (None, Some(first)) => first.len(),
        (None, None) => return Err(anyhow!("CSV file has neither a header nor any rows")),
    };
    if n_columns < 2 {
        return Err(anyhow!("Need at least one feature column and a label column, found {} columns", n_columns));
    }

    let label_idx = match &config.label_column {
        Some(name) => resolve_column(headers.as_ref(), name, n_columns)?,
        None => n_columns - 1,
    };
    let feature_indices: Vec<usize> = (0..n_columns).filter(|&c| c != label_idx).collect();

    let mut forced = Vec::with_capacity(config.nominal_columns.len());
    for name in &config.nominal_columns {
        forced.push(resolve_column(headers.as_ref(), name, n_columns)?);
    }

    let nominal: Vec<bool> = feature_indices
        .iter()
        .map(|&c| {
            forced.contains(&c)
                || records
                    .iter()
                    .any(|r| r.get(c).map_or(false, |v| v.parse::<f64>().is_err()))
        })
        .collect();

    let integer_labels = records
        .iter()
        .all(|r| r.get(label_idx).map_or(false, |v| v.parse::<Label>().is_ok()));

    let mut tables: Vec<CodeTable> = feature_indices.iter().map(|_| CodeTable::default()).collect();
    let mut label_table = CodeTable::default();
    let mut rows = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());

    for (row_idx, record) in records.iter().enumerate() {
        if record.len() != n_columns {
            return Err(anyhow!(
                "Row {} has {} fields, expected {}",
                row_idx + 1,
                record.len(),
                n_columns
            ));
        }
        let mut row = Vec::with_capacity(feature_indices.len());
        for (f, &c) in feature_indices.iter().enumerate() {
            let value = record.get(c).unwrap_or_default();
            if nominal[f] {
                row.push(tables[f].encode(value) as f64);
            } else {
                row.push(value.parse::<f64>().with_context(|| {
                    format!("Invalid value '{}' in column {} at row {}", value, c, row_idx + 1)
                })?);
            }
        }
        rows.push(row);

        let raw_label = record.get(label_idx).unwrap_or_default();
        let label = if integer_labels {
            raw_label
                .parse::<Label>()
                .with_context(|| format!("Invalid label at row {}", row_idx + 1))?
        } else {
            label_table.encode(raw_label) as Label
        };
        labels.push(label);
    }

    let column_name = |c: usize| -> String {
        headers
            .as_ref()
            .and_then(|h| h.get(c))
            .map(str::to_string)
            .unwrap_or_else(|| format!("attr{}", c))
    };
    let metadata = CsvMetadata {
        delimiter: config.delimiter,
        feature_names: feature_indices.iter().map(|&c| column_name(c)).collect(),
        label_name: headers
            .as_ref()
            .and_then(|h| h.get(label_idx))
            .unwrap_or("class")
            .to_string(),
        label_codes: label_table.values,
        nominal_codes: tables
            .into_iter()
            .zip(&nominal)
            .map(|(t, &is_nominal)| if is_nominal { t.values } else { Vec::new() })
            .collect(),
    };

    let dataset = Dataset::from_rows(&rows, labels, nominal).context("Failed to build dataset")?;
    log::info!(
        "Read {} rows with {} attributes from {}",
        dataset.n_samples(),
        dataset.n_features(),
        path.as_ref().display()
    );
    Ok(LabeledCsv { dataset, metadata })
}

/// Write `data` with a header row, the label in the last column.
pub fn write_csv<P: AsRef<Path>>(path: P, data: &Dataset, metadata: &CsvMetadata) -> Result<()> {
    if metadata.feature_names.len() != data.n_features() {
        return Err(anyhow!(
            "Metadata describes {} attributes, dataset has {}",
            metadata.feature_names.len(),
            data.n_features()
        ));
    }
    let mut writer = WriterBuilder::new()
        .delimiter(metadata.delimiter)
        .from_path(&path)
        .with_context(|| format!("Failed to create CSV file: {}", path.as_ref().display()))?;

    let mut header = metadata.feature_names.clone();
    header.push(metadata.label_name.clone());
    writer.write_record(&header).context("Failed to write CSV header")?;

    for i in 0..data.n_samples() {
        let mut record: Vec<String> = data
            .row(i)
            .iter()
            .enumerate()
            .map(|(f, &v)| metadata.format_value(f, v))
            .collect();
        record.push(metadata.label_name_of(data.y[i]));
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write row {}", i + 1))?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Column index by header name, or by zero-based position.
fn resolve_column(headers: Option<&StringRecord>, name: &str, n_columns: usize) -> Result<usize> {
    if let Some(h) = headers {
        if let Some(idx) = h.iter().position(|header| header.eq_ignore_ascii_case(name)) {
            return Ok(idx);
        }
    }
    match name.parse::<usize>() {
        Ok(idx) if idx < n_columns => Ok(idx),
        _ => Err(anyhow!("Missing column '{}'", name)),
    }
}
