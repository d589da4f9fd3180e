use std::collections::BTreeSet;
use std::io::Write;

use capstan_core::{AppError, AppResult};
use capstan_domain::{ExportFile, ExportFormat, ExportOptions, SearchQuery};
use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::search_service::SearchService;

/// Export serializer for the search pipeline.
///
/// Re-runs the query's filtering and sorting without pagination so the
/// encoded payload always covers the full match set, then encodes it in the
/// requested container format. Encoding is all-or-nothing: a fault anywhere
/// fails the call and no file is returned.
#[derive(Clone)]
pub struct ExportService {
    search: SearchService,
}

impl ExportService {
    /// Creates an export service on top of the query executor.
    #[must_use]
    pub fn new(search: SearchService) -> Self {
        Self { search }
    }

    /// Exports the query's unpaged match set in the requested format.
    pub async fn export(
        &self,
        query: &SearchQuery,
        options: &ExportOptions,
    ) -> AppResult<ExportFile> {
        let rows = self.search.unpaged_rows(query).await?;
        let record_count = rows.len();

        let mut rows = rows;
        if !options.include_relations {
            for row in &mut rows {
                if let Value::Object(object) = row {
                    object.retain(|_, value| !value.is_object());
                }
            }
        }

        if options.flatten_json {
            rows = rows.iter().map(flatten_row).collect();
        }

        let columns = column_names(&rows);
        let bytes = match options.format {
            ExportFormat::Json => encode_json(query, &rows, record_count, options)?,
            ExportFormat::Csv => encode_csv(&rows, &columns, record_count, options)?,
            ExportFormat::Excel => encode_excel(&rows, &columns, record_count, options)?,
            ExportFormat::Pdf => encode_pdf_report(&rows, &columns, record_count, options),
        };

        let mut filename = match options
            .custom_filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            Some(name) => name.to_owned(),
            None => format!(
                "{}_export_{}.{}",
                query.entity,
                Utc::now().format("%Y%m%d_%H%M%S"),
                options.format.extension()
            ),
        };

        let bytes = if options.compression {
            filename.push_str(".gz");
            gzip(&bytes)?
        } else {
            bytes
        };

        info!(
            entity = %query.entity,
            format = options.format.as_str(),
            record_count,
            size_bytes = bytes.len(),
            "export completed"
        );

        Ok(ExportFile {
            filename,
            format: options.format,
            record_count,
            bytes,
        })
    }
}

/// Sorted union of the keys present across all rows.
fn column_names(rows: &[Value]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for row in rows {
        if let Value::Object(object) = row {
            for key in object.keys() {
                names.insert(key.clone());
            }
        }
    }

    names.into_iter().collect()
}

/// Flattens nested objects to dotted keys; lists of objects become
/// `key.N.field` entries and plain lists are JSON-stringified.
fn flatten_row(row: &Value) -> Value {
    let mut flat = Map::new();
    match row {
        Value::Object(object) => {
            for (key, value) in object {
                flatten_into(value, key.clone(), &mut flat);
            }
        }
        other => {
            flat.insert("value".to_owned(), other.clone());
        }
    }

    Value::Object(flat)
}

fn flatten_into(value: &Value, key: String, out: &mut Map<String, Value>) {
    match value {
        Value::Object(object) => {
            for (child_key, child) in object {
                flatten_into(child, format!("{key}.{child_key}"), out);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(item, format!("{key}.{index}"), out);
            }
        }
        Value::Array(items) => {
            let rendered = if items.is_empty() {
                String::new()
            } else {
                serde_json::to_string(items).unwrap_or_default()
            };
            out.insert(key, Value::String(rendered));
        }
        other => {
            out.insert(key, other.clone());
        }
    }
}

/// Renders one cell for tabular formats; non-scalar values are stringified.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn encode_json(
    query: &SearchQuery,
    rows: &[Value],
    record_count: usize,
    options: &ExportOptions,
) -> AppResult<Vec<u8>> {
    let mut payload = Map::new();
    payload.insert("data".to_owned(), Value::Array(rows.to_vec()));
    if options.include_metadata {
        payload.insert(
            "metadata".to_owned(),
            json!({
                "entity": query.entity,
                "total_count": record_count,
                "exported_at": Utc::now().to_rfc3339(),
            }),
        );
    }

    serde_json::to_vec_pretty(&Value::Object(payload))
        .map_err(|error| AppError::ExecutionFailure(format!("json encode failed: {error}")))
}

fn encode_csv(
    rows: &[Value],
    columns: &[String],
    record_count: usize,
    options: &ExportOptions,
) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    if options.include_headers {
        writer
            .write_record(columns)
            .map_err(|error| AppError::ExecutionFailure(format!("csv encode failed: {error}")))?;
    }

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell_text(row.as_object().and_then(|object| object.get(column))))
            .collect();
        writer
            .write_record(&record)
            .map_err(|error| AppError::ExecutionFailure(format!("csv encode failed: {error}")))?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|error| AppError::ExecutionFailure(format!("csv encode failed: {error}")))?;

    if options.include_metadata {
        let metadata = format!(
            "\n# Metadata\n# Total Count: {record_count}\n# Exported At: {}\n",
            Utc::now().to_rfc3339()
        );
        bytes.extend_from_slice(metadata.as_bytes());
    }

    Ok(bytes)
}

fn encode_excel(
    rows: &[Value],
    columns: &[String],
    record_count: usize,
    options: &ExportOptions,
) -> AppResult<Vec<u8>> {
    let xlsx_error =
        |error: rust_xlsxwriter::XlsxError| AppError::ExecutionFailure(format!("xlsx encode failed: {error}"));

    let mut workbook = Workbook::new();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Data Export").map_err(xlsx_error)?;

        let mut row_index: u32 = 0;
        if options.include_headers {
            for (column_index, column) in columns.iter().enumerate() {
                worksheet
                    .write_string(0, column_index as u16, column.as_str())
                    .map_err(xlsx_error)?;
            }
            row_index = 1;
        }

        for row in rows {
            for (column_index, column) in columns.iter().enumerate() {
                let text = cell_text(row.as_object().and_then(|object| object.get(column)));
                worksheet
                    .write_string(row_index, column_index as u16, text)
                    .map_err(xlsx_error)?;
            }
            row_index += 1;
        }
    }

    if options.include_metadata {
        let metadata_sheet = workbook.add_worksheet();
        metadata_sheet.set_name("Metadata").map_err(xlsx_error)?;
        metadata_sheet
            .write_string(0, 0, "Total Count")
            .map_err(xlsx_error)?;
        metadata_sheet
            .write_string(0, 1, record_count.to_string())
            .map_err(xlsx_error)?;
        metadata_sheet
            .write_string(1, 0, "Exported At")
            .map_err(xlsx_error)?;
        metadata_sheet
            .write_string(1, 1, Utc::now().to_rfc3339())
            .map_err(xlsx_error)?;
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Renders the row set as a paginated text report and packages it as PDF.
///
/// Every row is rendered; only cell width is truncated for readability.
fn encode_pdf_report(
    rows: &[Value],
    columns: &[String],
    record_count: usize,
    options: &ExportOptions,
) -> Vec<u8> {
    const CELL_WIDTH: usize = 24;

    let mut lines = vec!["Data Export Report".to_owned(), String::new()];

    if options.include_metadata {
        lines.push(format!("Total Records: {record_count}"));
        lines.push(format!("Exported At: {}", Utc::now().to_rfc3339()));
        lines.push(String::new());
    }

    let render_cell = |text: String| {
        if text.len() > CELL_WIDTH {
            let mut truncated: String = text.chars().take(CELL_WIDTH - 3).collect();
            truncated.push_str("...");
            truncated
        } else {
            text
        }
    };

    if options.include_headers {
        lines.push(
            columns
                .iter()
                .map(|column| render_cell(column.clone()))
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }

    for row in rows {
        lines.push(
            columns
                .iter()
                .map(|column| {
                    render_cell(cell_text(row.as_object().and_then(|object| object.get(column))))
                })
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }

    package_pdf(&lines)
}

/// Assembles a minimal single-font PDF document from text lines.
fn package_pdf(lines: &[String]) -> Vec<u8> {
    const LINES_PER_PAGE: usize = 48;

    let empty: &[String] = &[];
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![empty]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..chunks.len())
        .map(|page| format!("{} 0 R", 4 + page * 2))
        .collect();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_owned());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        chunks.len()
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_owned());

    for (page, chunk) in chunks.iter().enumerate() {
        let mut stream = String::from("BT\n/F1 9 Tf\n1 0 0 1 40 752 Tm\n13 TL\n");
        for line in *chunk {
            stream.push_str(&format!("({}) Tj\nT*\n", escape_pdf_text(line)));
        }
        stream.push_str("ET");

        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + page * 2
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut output = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(output.len());
        output.push_str(&format!("{} 0 obj\n{object}\nendobj\n", index + 1));
    }

    let xref_offset = output.len();
    output.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        output.push_str(&format!("{offset:010} 00000 n \n"));
    }
    output.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));

    output.into_bytes()
}

fn escape_pdf_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

fn gzip(bytes: &[u8]) -> AppResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|error| AppError::ExecutionFailure(format!("gzip failed: {error}")))?;
    encoder
        .finish()
        .map_err(|error| AppError::ExecutionFailure(format!("gzip failed: {error}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use capstan_core::AppResult;
    use capstan_domain::{
        ExportFormat, ExportOptions, FieldDefinition, FieldType, SearchOperator, SearchQuery,
    };
    use serde_json::{Value, json};

    use super::ExportService;
    use crate::field_registry::{EntitySchema, FieldRegistry};
    use crate::search_ports::CandidateProvider;
    use crate::search_service::SearchService;

    struct StubProvider;

    #[async_trait]
    impl CandidateProvider for StubProvider {
        async fn candidate_rows(&self, entity: &str) -> AppResult<Vec<Value>> {
            if entity != "students" {
                return Ok(Vec::new());
            }

            Ok(vec![
                json!({"id": 1, "first_name": "Ada", "gpa": 3.9, "user": {"email": "ada@example.edu"}}),
                json!({"id": 2, "first_name": "Grace", "gpa": 3.6, "user": {"email": "grace@example.edu"}}),
                json!({"id": 3, "first_name": "Alan", "gpa": 3.2, "user": {"email": "alan@example.edu"}}),
            ])
        }
    }

    fn export_service() -> ExportService {
        let fields = vec![
            FieldDefinition::new(
                "first_name",
                "First Name",
                FieldType::String,
                vec![SearchOperator::Equals, SearchOperator::Contains],
                None,
                None,
                None,
                SearchOperator::Contains,
            )
            .unwrap_or_else(|_| unreachable!()),
            FieldDefinition::new(
                "gpa",
                "GPA",
                FieldType::Float,
                vec![SearchOperator::GreaterThan],
                Some(0.0),
                Some(4.0),
                None,
                SearchOperator::GreaterThan,
            )
            .unwrap_or_else(|_| unreachable!()),
        ];
        let schema = EntitySchema::new(
            "students",
            "Students",
            fields,
            vec!["first_name".to_owned()],
            Vec::new(),
            Vec::new(),
        )
        .unwrap_or_else(|_| unreachable!());
        let registry = FieldRegistry::new(vec![schema]).unwrap_or_else(|_| unreachable!());

        ExportService::new(SearchService::new(
            Arc::new(registry),
            Arc::new(StubProvider),
            Duration::from_secs(5),
        ))
    }

    fn options(format: ExportFormat) -> ExportOptions {
        ExportOptions {
            format,
            include_headers: true,
            include_metadata: false,
            include_relations: false,
            flatten_json: true,
            custom_filename: None,
            compression: false,
        }
    }

    #[tokio::test]
    async fn export_ignores_the_page_window() {
        let service = export_service();
        let mut query = SearchQuery::for_entity("students");
        query.page_size = 1;

        let file = service
            .export(&query, &options(ExportFormat::Json))
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(file.record_count, 3);
        let decoded: Value =
            serde_json::from_slice(&file.bytes).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            decoded
                .get("data")
                .and_then(Value::as_array)
                .map(Vec::len),
            Some(3)
        );
    }

    #[tokio::test]
    async fn csv_header_row_is_optional() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");

        let with_headers = service
            .export(&query, &options(ExportFormat::Csv))
            .await
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8(with_headers.bytes).unwrap_or_default();
        assert!(text.starts_with("first_name,gpa,id"));

        let mut no_headers = options(ExportFormat::Csv);
        no_headers.include_headers = false;
        let without_headers = service
            .export(&query, &no_headers)
            .await
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8(without_headers.bytes).unwrap_or_default();
        assert!(text.starts_with("Ada,"));
    }

    #[tokio::test]
    async fn relations_are_dropped_unless_requested() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");

        let without = service
            .export(&query, &options(ExportFormat::Csv))
            .await
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8(without.bytes).unwrap_or_default();
        assert!(!text.contains("user.email"));

        let mut with_relations = options(ExportFormat::Csv);
        with_relations.include_relations = true;
        let with = service
            .export(&query, &with_relations)
            .await
            .unwrap_or_else(|_| unreachable!());
        let text = String::from_utf8(with.bytes).unwrap_or_default();
        assert!(text.contains("user.email"));
        assert!(text.contains("ada@example.edu"));
    }

    #[tokio::test]
    async fn excel_payload_is_a_zip_container() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");
        let file = service
            .export(&query, &options(ExportFormat::Excel))
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(file.bytes.starts_with(b"PK"));
        assert!(file.filename.ends_with(".xlsx"));
    }

    #[tokio::test]
    async fn pdf_payload_is_a_pdf_document() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");
        let file = service
            .export(&query, &options(ExportFormat::Pdf))
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(file.bytes.starts_with(b"%PDF-1.4"));
        assert!(file.bytes.ends_with(b"%%EOF\n"));
    }

    #[tokio::test]
    async fn compression_wraps_the_payload_in_gzip() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");
        let mut compressed = options(ExportFormat::Json);
        compressed.compression = true;

        let file = service
            .export(&query, &compressed)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(file.bytes.starts_with(&[0x1f, 0x8b]));
        assert!(file.filename.ends_with(".json.gz"));
    }

    #[tokio::test]
    async fn custom_filename_wins_over_generation() {
        let service = export_service();
        let query = SearchQuery::for_entity("students");
        let mut named = options(ExportFormat::Json);
        named.custom_filename = Some("roster.json".to_owned());

        let file = service
            .export(&query, &named)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(file.filename, "roster.json");
    }

    #[tokio::test]
    async fn unknown_entity_fails_the_export() {
        let service = export_service();
        let query = SearchQuery::for_entity("aliens");
        let result = service.export(&query, &options(ExportFormat::Json)).await;
        assert!(result.is_err());
    }
}
