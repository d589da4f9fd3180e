use std::str::FromStr;

use capstan_core::AppError;
use serde::{Deserialize, Serialize};

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// JSON array of row objects.
    Json,
    /// Comma-separated values.
    Csv,
    /// XLSX workbook.
    Excel,
    /// PDF report.
    Pdf,
}

impl ExportFormat {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Pdf => "pdf",
        }
    }

    /// Returns the filename extension for the format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "excel" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            _ => Err(AppError::Validation(format!(
                "unknown export format '{value}'"
            ))),
        }
    }
}

/// Options controlling an export encode.
///
/// Export always operates on the unpaged filtered set, never on a single
/// page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Target encoding.
    pub format: ExportFormat,
    /// Whether tabular formats emit a header row.
    #[serde(default = "default_true")]
    pub include_headers: bool,
    /// Whether result metadata is appended to the payload.
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    /// Whether nested relation objects are kept before encoding.
    #[serde(default)]
    pub include_relations: bool,
    /// Whether nested objects are flattened to dotted keys.
    #[serde(default = "default_true")]
    pub flatten_json: bool,
    /// Overrides the generated filename when present.
    #[serde(default)]
    pub custom_filename: Option<String>,
    /// Whether the payload is gzip-compressed.
    #[serde(default)]
    pub compression: bool,
}

fn default_true() -> bool {
    true
}

/// A completed export payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Generated or caller-provided filename.
    pub filename: String,
    /// Encoding that produced the payload.
    pub format: ExportFormat,
    /// Number of exported rows (the query's unpaged match count).
    pub record_count: usize,
    /// Encoded payload bytes.
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ExportFormat, ExportOptions};

    #[test]
    fn excel_uses_xlsx_extension() {
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
    }

    #[test]
    fn options_default_sensibly_on_deserialize() {
        let options: ExportOptions =
            serde_json::from_value(json!({"format": "csv"})).unwrap_or_else(|_| unreachable!());
        assert!(options.include_headers);
        assert!(options.include_metadata);
        assert!(!options.include_relations);
        assert!(options.flatten_json);
        assert!(!options.compression);
    }
}
