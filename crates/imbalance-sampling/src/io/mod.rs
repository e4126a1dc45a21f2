pub mod csv;

pub use self::csv::{read_csv, write_csv, CsvMetadata, CsvReaderConfig, LabeledCsv};
