//! Modelos de dominio del pipeline documento → resumen legal estructurado.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separador entre páginas al concatenar el texto extraído.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Fichero subido. Sólo vive durante la petición; el propietario lo fija `Pipeline::process`.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub client_name: Option<String>,
    pub file_type: Option<String>,
    /// Identificador proporcionado por el cliente; si falta se deriva del contenido.
    pub document_id: Option<String>,
}

/// Texto extraído del PDF, una entrada por página y en orden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Longitud en caracteres del texto completo (páginas unidas con `PAGE_SEPARATOR`).
    pub fn combined_len(&self) -> usize {
        let text: usize = self.pages.iter().map(|p| p.chars().count()).sum();
        let separators = self.pages.len().saturating_sub(1) * PAGE_SEPARATOR.chars().count();
        text + separators
    }

    pub fn joined(&self) -> String {
        self.pages.join(PAGE_SEPARATOR)
    }
}

/// Petición inmutable para el servicio de resumen.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub preamble: String,
    pub document: String,
    pub temperature: f64,
    pub max_tokens: u64,
    pub truncated: bool,
    pub pages_included: usize,
}

/// Salida en bruto del LLM. Se trata como entrada no fiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse {
    pub text: String,
}

impl RawModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Ongoing,
    Closed,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseConfidence {
    Full,
    #[default]
    Partial,
}

/// Fecha ya pasada o pendiente respecto al día de la normalización.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateStatus {
    #[default]
    Completed,
    Upcoming,
}

impl DateStatus {
    /// Las fechas de hoy cuentan como pendientes.
    pub fn classify(date: NaiveDate, today: NaiveDate) -> Self {
        if date >= today {
            Self::Upcoming
        } else {
            Self::Completed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HearingDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: DateStatus,
}

impl HearingDate {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
            status: DateStatus::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Fecha canónica `YYYY-MM-DD`, o cadena vacía si no se pudo interpretar.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub event: String,
    /// Sólo existe cuando `date` es una fecha válida.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DateStatus>,
}

/// Registro normalizado. Todos los campos existen siempre (vacíos o `Unknown`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseSummary {
    pub case_name: String,
    pub court_name: String,
    pub overview: String,
    pub parties: BTreeSet<String>,
    pub sections_of_law: Vec<String>,
    pub hearing_dates: Vec<HearingDate>,
    pub timeline: Vec<TimelineEvent>,
    pub status: CaseStatus,
    pub recommendations: Vec<String>,
}

impl CaseSummary {
    /// Marca cada vista y evento como pasado o pendiente respecto a `today`.
    pub fn classify_dates(&mut self, today: NaiveDate) {
        for hearing in &mut self.hearing_dates {
            hearing.status = DateStatus::classify(hearing.date, today);
        }
        for event in &mut self.timeline {
            event.status = NaiveDate::parse_from_str(&event.date, "%Y-%m-%d")
                .ok()
                .map(|date| DateStatus::classify(date, today));
        }
    }

    pub fn has_upcoming_dates(&self) -> bool {
        self.hearing_dates
            .iter()
            .any(|h| h.status == DateStatus::Upcoming)
            || self
                .timeline
                .iter()
                .any(|e| e.status == Some(DateStatus::Upcoming))
    }
}

/// Resultado del normalizador: el resumen y el grado de confianza del parseo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSummary {
    pub summary: CaseSummary,
    pub confidence: ParseConfidence,
}

/// Documento persistido en el almacén, uno por `(user_id, document_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub user_id: String,
    pub document_id: String,
    pub filename: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub file_type: String,
    pub summary: CaseSummary,
    pub parse_confidence: ParseConfidence,
    pub truncated: bool,
    /// Marca temporal RFC 3339 de la última ejecución del pipeline.
    pub updated_at: String,
}
