//! CSV export and import of records
//!
//! Export writes every record's scalar fields (no photos) with a fixed
//! column set. Import reads the same layout, or the column names of the
//! older spreadsheet register, and upserts by RNC number. A file is either
//! imported completely or not at all.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rnc_common::db::{Effectiveness, NonConformity, Severity};
use rnc_common::{Error, Result, Status};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

use crate::db::records::{self, UpsertSummary};

/// Bump when `EXPORT_COLUMNS` changes
pub const FORMAT_VERSION: u32 = 1;

/// Column order of an export file
pub const EXPORT_COLUMNS: [&str; 28] = [
    "rnc_number",
    "occurred_on",
    "issuer",
    "area",
    "project_code",
    "title",
    "inspector",
    "description",
    "references",
    "cause",
    "process",
    "origin",
    "corrective_action",
    "severity",
    "category",
    "action_owner",
    "status",
    "opened_at",
    "closed_at",
    "closed_by",
    "closing_notes",
    "effectiveness",
    "reopened_at",
    "reopened_by",
    "reopening_reason",
    "cancelled_at",
    "cancelled_by",
    "cancel_reason",
];

/// Columns an import file must have
pub const REQUIRED_COLUMNS: [&str; 2] = ["rnc_number", "status"];

const BOM: char = '\u{feff}';
const EXPORT_DELIMITER: u8 = b';';

/// Column names used by the spreadsheet register, mapped to current names
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("rnc_num", "rnc_number"),
    ("rnc_nº", "rnc_number"),
    ("rnc_no", "rnc_number"),
    ("rnc_no.", "rnc_number"),
    ("rnc_numero", "rnc_number"),
    ("rnc", "rnc_number"),
    ("data", "occurred_on"),
    ("emitente", "issuer"),
    ("pep", "project_code"),
    ("pep_descricao", "project_code"),
    ("titulo", "title"),
    ("responsavel", "inspector"),
    ("responsável", "inspector"),
    ("responsavel_inspecao", "inspector"),
    ("descricao", "description"),
    ("referencias", "references"),
    ("causador", "cause"),
    ("processo_envolvido", "process"),
    ("origem", "origin"),
    ("acao_correcao", "corrective_action"),
    ("severidade", "severity"),
    ("categoria_risco", "severity"),
    ("categoria", "category"),
    ("responsavel_acao", "action_owner"),
    ("encerrada_em", "closed_at"),
    ("encerrada_por", "closed_by"),
    ("encerramento_obs", "closing_notes"),
    ("eficacia", "effectiveness"),
    ("reaberta_em", "reopened_at"),
    ("reaberta_por", "reopened_by"),
    ("reabertura_motivo", "reopening_reason"),
];

/// Drop a leading UTF-8 byte-order mark
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Pick `;` or `,` by counting both in the header line
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}

/// Trim, lowercase, spaces to underscores, then resolve legacy names
pub fn normalize_header(raw: &str) -> String {
    let key = raw.trim().trim_start_matches(BOM).to_lowercase().replace(' ', "_");
    LEGACY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or(key)
}

/// Serialize records to CSV bytes (BOM, `;` delimited)
pub fn export_csv(records: &[NonConformity]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(BOM.to_string().as_bytes());

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(EXPORT_DELIMITER)
            .from_writer(&mut out);

        writer.write_record(EXPORT_COLUMNS).map_err(csv_fault)?;
        for record in records {
            writer.write_record(export_row(record)).map_err(csv_fault)?;
        }
        writer.flush()?;
    }

    Ok(out)
}

/// Export every record, ordered by RNC number
pub async fn export(pool: &SqlitePool) -> Result<Vec<u8>> {
    let records = records::list_all(pool).await?;
    let bytes = export_csv(&records)?;
    info!("Exported {} record(s) to CSV", records.len());
    Ok(bytes)
}

/// Parse and upsert an import file in one transaction
pub async fn import(pool: &SqlitePool, text: &str) -> Result<UpsertSummary> {
    let parsed = parse_import(text)?;
    let summary = records::upsert_many(pool, &parsed).await?;
    info!(
        "CSV import: {} inserted, {} updated",
        summary.inserted, summary.updated
    );
    Ok(summary)
}

/// Parse every row of an import file; any malformed row rejects the file
pub fn parse_import(text: &str) -> Result<Vec<NonConformity>> {
    let text = strip_bom(text);
    if text.trim().is_empty() {
        return Err(Error::Import("file is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Import(format!("unreadable header: {}", e)))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (idx, name) in headers.into_iter().enumerate() {
        columns.entry(name).or_insert(idx);
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Import(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut parsed = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (i, row) in reader.records().enumerate() {
        // Header is line 1
        let line = i + 2;
        let row = row.map_err(|e| Error::Import(format!("row {}: {}", line, e)))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cells = Row {
            row: &row,
            columns: &columns,
            line,
        };
        let record = cells.to_record()?;

        if let Some(first) = seen.insert(record.rnc_number.clone(), line) {
            return Err(Error::Import(format!(
                "row {}: RNC number {} already appears on row {}",
                line, record.rnc_number, first
            )));
        }
        parsed.push(record);
    }

    Ok(parsed)
}

fn export_row(r: &NonConformity) -> Vec<String> {
    vec![
        r.rnc_number.clone(),
        r.occurred_on.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        r.issuer.clone(),
        r.area.clone(),
        r.project_code.clone().unwrap_or_default(),
        r.title.clone(),
        r.inspector.clone(),
        r.description.clone(),
        r.references.clone(),
        r.cause.clone(),
        r.process.clone(),
        r.origin.clone(),
        r.corrective_action.clone(),
        r.severity.map(|s| s.as_str().to_string()).unwrap_or_default(),
        r.category.clone(),
        r.action_owner.clone(),
        r.status.as_str().to_string(),
        timestamp_cell(r.opened_at),
        timestamp_cell(r.closed_at),
        r.closed_by.clone().unwrap_or_default(),
        r.closing_notes.clone().unwrap_or_default(),
        r.effectiveness.map(|e| e.as_str().to_string()).unwrap_or_default(),
        timestamp_cell(r.reopened_at),
        r.reopened_by.clone().unwrap_or_default(),
        r.reopening_reason.clone().unwrap_or_default(),
        timestamp_cell(r.cancelled_at),
        r.cancelled_by.clone().unwrap_or_default(),
        r.cancel_reason.clone().unwrap_or_default(),
    ]
}

fn timestamp_cell(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn csv_fault(err: csv::Error) -> Error {
    Error::Internal(format!("CSV write failed: {}", err))
}

/// One data row with its column lookup
struct Row<'a> {
    row: &'a csv::StringRecord,
    columns: &'a HashMap<String, usize>,
    line: usize,
}

impl Row<'_> {
    fn text(&self, column: &str) -> String {
        self.columns
            .get(column)
            .and_then(|idx| self.row.get(*idx))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn optional(&self, column: &str) -> Option<String> {
        Some(self.text(column)).filter(|s| !s.is_empty())
    }

    fn fault(&self, column: &str, detail: impl std::fmt::Display) -> Error {
        Error::Import(format!("row {}, column {}: {}", self.line, column, detail))
    }

    fn parsed<T>(&self, column: &str) -> Result<Option<T>>
    where
        T: FromStr<Err = Error>,
    {
        match self.optional(column) {
            Some(value) => value.parse().map(Some).map_err(|e| self.fault(column, e)),
            None => Ok(None),
        }
    }

    fn date(&self, column: &str) -> Result<Option<NaiveDate>> {
        match self.optional(column) {
            Some(value) => parse_date_cell(&value)
                .map(Some)
                .ok_or_else(|| self.fault(column, format!("unreadable date '{}'", value))),
            None => Ok(None),
        }
    }

    fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        match self.optional(column) {
            Some(value) => parse_timestamp_cell(&value)
                .map(Some)
                .ok_or_else(|| self.fault(column, format!("unreadable timestamp '{}'", value))),
            None => Ok(None),
        }
    }

    fn to_record(&self) -> Result<NonConformity> {
        let rnc_number = self
            .optional("rnc_number")
            .ok_or_else(|| self.fault("rnc_number", "value is blank"))?;
        let status: Status = self
            .parsed("status")?
            .ok_or_else(|| self.fault("status", "value is blank"))?;

        // Each non-open status carries the text of the transition behind it
        let event_text = match status {
            Status::Open => None,
            Status::Closed => Some("closing_notes"),
            Status::Reopened => Some("reopening_reason"),
            Status::Cancelled => Some("cancel_reason"),
        };
        if let Some(column) = event_text {
            if self.optional(column).is_none() {
                return Err(self.fault(column, format!("required for status {}", status)));
            }
        }

        Ok(NonConformity {
            id: 0,
            rnc_number,
            occurred_on: self.date("occurred_on")?,
            issuer: self.text("issuer"),
            area: self.text("area"),
            project_code: self.optional("project_code"),
            title: self.text("title"),
            inspector: self.text("inspector"),
            description: self.text("description"),
            references: self.text("references"),
            cause: self.text("cause"),
            process: self.text("process"),
            origin: self.text("origin"),
            corrective_action: self.text("corrective_action"),
            severity: self.parsed::<Severity>("severity")?,
            category: self.text("category"),
            action_owner: self.text("action_owner"),
            status,
            opened_at: self.timestamp("opened_at")?,
            closed_at: self.timestamp("closed_at")?,
            closed_by: self.optional("closed_by"),
            closing_notes: self.optional("closing_notes"),
            effectiveness: self.parsed::<Effectiveness>("effectiveness")?,
            reopened_at: self.timestamp("reopened_at")?,
            reopened_by: self.optional("reopened_by"),
            reopening_reason: self.optional("reopening_reason"),
            cancelled_at: self.timestamp("cancelled_at")?,
            cancelled_by: self.optional("cancelled_by"),
            cancel_reason: self.optional("cancel_reason"),
        })
    }
}

/// `YYYY-MM-DD`, `DD/MM/YYYY`, or the date part of a timestamp
fn parse_date_cell(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
        .or_else(|| parse_timestamp_cell(value).map(|t| t.date_naive()))
}

/// RFC 3339, or a naive `YYYY-MM-DD[ T]HH:MM:SS[.f]` read as UTC
fn parse_timestamp_cell(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn closed_record() -> NonConformity {
        let opened = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        NonConformity {
            id: 42,
            rnc_number: "2024-007".to_string(),
            occurred_on: NaiveDate::from_ymd_opt(2024, 3, 1),
            issuer: "Ana".to_string(),
            area: "Pátio; setor 2".to_string(),
            project_code: Some("PEP-12 — Upgrade".to_string()),
            title: "Guarda-corpo solto".to_string(),
            inspector: "Bruno".to_string(),
            description: "Fixação com folga,\nrisco de queda".to_string(),
            references: "NR-35".to_string(),
            cause: "Fornecedor; Montagem".to_string(),
            process: "Montagem".to_string(),
            origin: "Inspeção".to_string(),
            corrective_action: "Retrabalho".to_string(),
            severity: Some(Severity::High),
            category: "Segurança".to_string(),
            action_owner: "Carla".to_string(),
            status: Status::Closed,
            opened_at: Some(opened),
            closed_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 16, 0, 0).unwrap()),
            closed_by: Some("Carla".to_string()),
            closing_notes: Some("Reapertado".to_string()),
            effectiveness: Some(Effectiveness::Effective),
            reopened_at: None,
            reopened_by: None,
            reopening_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    #[test]
    fn test_normalize_header_aliases() {
        assert_eq!(normalize_header(" RNC Nº "), "rnc_number");
        assert_eq!(normalize_header("rnc_num"), "rnc_number");
        assert_eq!(normalize_header("Categoria_Risco"), "severity");
        assert_eq!(normalize_header("Closing Notes"), "closing_notes");
        assert_eq!(normalize_header("something_else"), "something_else");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("single\nvalue"), b',');
    }

    #[test]
    fn test_export_header_and_bom() {
        let bytes = export_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with('\u{feff}'));
        assert_eq!(strip_bom(&text).trim_end(), EXPORT_COLUMNS.join(";"));
    }

    #[test]
    fn test_export_then_parse_keeps_fields() {
        let record = closed_record();
        let bytes = export_csv(std::slice::from_ref(&record)).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let parsed = parse_import(&text).unwrap();
        assert_eq!(parsed.len(), 1);

        // Internal id is never exported
        let expected = NonConformity { id: 0, ..record };
        assert_eq!(parsed[0], expected);
    }

    #[test]
    fn test_missing_status_column_rejected() {
        let err = parse_import("rnc_number;title\n2024-001;Teste\n").unwrap_err();
        match err {
            Error::Import(msg) => assert!(msg.contains("status"), "{}", msg),
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_rnc_number_rejects_file() {
        let err = parse_import("rnc_number,status\n2024-001,open\n,closed\n").unwrap_err();
        match err {
            Error::Import(msg) => assert!(msg.contains("row 3"), "{}", msg),
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_status_names_row_and_column() {
        let err = parse_import("rnc_number;status\n2024-001;blocked\n").unwrap_err();
        match err {
            Error::Import(msg) => {
                assert!(msg.contains("row 2"), "{}", msg);
                assert!(msg.contains("status"), "{}", msg);
            }
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_number_in_file_rejected() {
        let err = parse_import("rnc_number;status\n2024-001;open\n2024-001;open\n").unwrap_err();
        match err {
            Error::Import(msg) => assert!(msg.contains("already appears on row 2"), "{}", msg),
            other => panic!("expected import error, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_columns_and_values() {
        let text = "\u{feff}id,data,rnc_num,titulo,status,severidade,eficacia,encerrada_em,encerramento_obs,extra\n\
                    7,2023-11-02 08:15:00,2023-015,Vazamento,Encerrada,Média,Eficaz,2023-11-10 17:00:00,Junta trocada,x\n";
        let parsed = parse_import(text).unwrap();
        let record = &parsed[0];

        assert_eq!(record.rnc_number, "2023-015");
        assert_eq!(record.title, "Vazamento");
        assert_eq!(record.status, Status::Closed);
        assert_eq!(record.closing_notes.as_deref(), Some("Junta trocada"));
        assert_eq!(record.severity, Some(Severity::Medium));
        assert_eq!(record.effectiveness, Some(Effectiveness::Effective));
        assert_eq!(record.occurred_on, NaiveDate::from_ymd_opt(2023, 11, 2));
        assert_eq!(
            record.closed_at,
            Some(Utc.with_ymd_and_hms(2023, 11, 10, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_status_without_its_text_rejected() {
        let cases = [
            ("2024-001;closed;;;", "closing_notes"),
            ("2024-001;reopened;Fixed;;", "reopening_reason"),
            ("2024-001;cancelled;Fixed;Loose again;", "cancel_reason"),
        ];
        for (row, column) in cases {
            let text = format!(
                "rnc_number;status;closing_notes;reopening_reason;cancel_reason\n{}\n",
                row
            );
            match parse_import(&text).unwrap_err() {
                Error::Import(msg) => {
                    assert!(msg.contains("row 2"), "{}", msg);
                    assert!(msg.contains(column), "{}", msg);
                }
                other => panic!("expected import error, got {:?}", other),
            }
        }

        let ok = "rnc_number;status;cancel_reason\n2024-001;cancelled;Duplicate\n";
        assert_eq!(parse_import(ok).unwrap()[0].status, Status::Cancelled);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let parsed = parse_import("rnc_number;status\n2024-001;open\n;\n").unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
