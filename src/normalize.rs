//! Normalización tolerante de la respuesta del LLM a un `CaseSummary` fijo.
//!
//! Nunca falla: lo que se reconoce rellena el resumen, lo que falta o está mal
//! formado se queda con su valor vacío y la confianza baja a `Partial`.
//!
//! Estrategia:
//!   1. Limpieza del texto (espacios duros, guiones tipográficos, espacios repetidos).
//!   2. Localización de un objeto JSON (texto completo, bloque ```json o `{ ... }` externo).
//!   3. Lectura campo a campo con alias de claves, o análisis de texto libre si no hay JSON.
//!   4. Fechas marcadas como pasadas o pendientes respecto al día de hoy.
//!   5. Estado del caso por heurística de palabras clave (no es un clasificador fiable);
//!      una vista pendiente mantiene el caso abierto.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    dates::{canonical, find_dates, parse_date, snippet},
    models::{
        CaseStatus, CaseSummary, HearingDate, NormalizedSummary, ParseConfidence,
        RawModelResponse, TimelineEvent,
    },
};

const PARTIES_KEYS: &[&str] = &["parties", "caseparties", "partiesinvolved"];
const SECTIONS_KEYS: &[&str] = &[
    "sectionsoflaw",
    "sectionsinvoked",
    "sections",
    "lawsections",
    "legalprovisions",
];
const HEARINGS_KEYS: &[&str] = &["hearingdates", "hearings", "nexthearings", "dates"];
const TIMELINE_KEYS: &[&str] = &["timeline", "casetimeline", "events"];
const STATUS_KEYS: &[&str] = &["status", "casestatus"];
const RECOMMENDATIONS_KEYS: &[&str] = &["recommendations", "tips", "nextsteps", "casetips"];
const CASE_NAME_KEYS: &[&str] = &["casename", "title", "casetitle"];
const COURT_KEYS: &[&str] = &["courtname", "court"];
const OVERVIEW_KEYS: &[&str] = &["overview", "summary", "facts"];

/// Términos que indican un caso concluido. Se comparan como palabras completas.
const CLOSED_TERMS: &[&str] = &[
    "disposed",
    "closed",
    "dismissed",
    "acquitted",
    "convicted",
    "sentenced",
    "decided",
    "decreed",
    "withdrawn",
];

lazy_static! {
    static ref CLOSED_RE: Regex =
        Regex::new(&format!(r"(?i)\b(?:{})\b", CLOSED_TERMS.join("|"))).unwrap();
    static ref FENCED_JSON_RE: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap();
    static ref HSPACE_RE: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref NEWLINE_RE: Regex = Regex::new(r"\s*\n\s*").unwrap();
    static ref VERSUS_RE: Regex = Regex::new(
        r"(?i)\b([A-Z][\w.&' ]{1,80}?)\s+(?:vs\.?|v\.|versus)\s+([A-Z][\w.&' ]{1,80})"
    )
    .unwrap();
    static ref PARTY_LINE_RE: Regex = Regex::new(
        r"(?im)^\W*(?:parties|petitioners?|respondents?|appellants?|plaintiffs?|defendants?|accused|complainants?)\W*\s*[:\-]\s*(.+)$"
    )
    .unwrap();
    static ref SECTION_RE: Regex = Regex::new(
        r"(?i)\b(?:u/s\.?|under\s+sections?|sections?|secs?\.)\s*(?P<nums>\d+[A-Za-z]?(?:\(\w+\))*(?:\s*(?:,|/|and|&)\s*\d+[A-Za-z]?(?:\(\w+\))*)*)(?:\s+(?:of\s+(?:the\s+)?)?(?P<act>IPC|CrPC|CPC|BNS|BNSS|NI\s+Act|IT\s+Act|Evidence\s+Act|PMLA|NDPS\s+Act|NDPS|Arms\s+Act|PC\s+Act|POCSO\s+Act|POCSO|Companies\s+Act|Motor\s+Vehicles\s+Act|Contract\s+Act))?"
    )
    .unwrap();
    static ref SECTION_NUM_RE: Regex = Regex::new(r"\d+[A-Za-z]?(?:\(\w+\))*").unwrap();
    static ref CODE_RE: Regex = Regex::new(
        r"\b(?P<title>[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*\s+(?:Code|Act))\s+(?P<no>\d+[A-Za-z]?(?:\(\w+\))*)"
    )
    .unwrap();
    static ref HEADING_RE: Regex =
        Regex::new(r"(?i)^\W*(?:recommendations?|tips|next\s+steps|suggestions)\b").unwrap();
    static ref BULLET_RE: Regex = Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").unwrap();
}

/// Convierte la salida del LLM en un resumen normalizado. No falla nunca.
pub fn normalize(raw: &RawModelResponse) -> NormalizedSummary {
    normalize_on(raw, Utc::now().date_naive())
}

/// Igual que [`normalize`], con `today` como referencia para las fechas pendientes.
pub fn normalize_on(raw: &RawModelResponse, today: NaiveDate) -> NormalizedSummary {
    let text = clean_text(&raw.text);

    if text.is_empty() {
        warn!("Respuesta vacía del modelo; se devuelve un resumen por defecto");
        return NormalizedSummary {
            summary: CaseSummary::default(),
            confidence: ParseConfidence::Partial,
        };
    }

    let normalized = match locate_json(&text) {
        Some((object, prose)) => normalize_object(&object, prose, &text, today),
        None => {
            debug!("La respuesta no contiene JSON; análisis de texto libre");
            normalize_free_text(&text, today)
        }
    };

    if normalized.confidence == ParseConfidence::Partial {
        warn!("Normalización parcial de la respuesta del modelo");
    }
    normalized
}

/// Espacios duros y guiones tipográficos a ASCII; espacios repetidos colapsados.
pub fn clean_text(text: &str) -> String {
    let replaced = text
        .replace('\u{00A0}', " ")
        .replace(['\u{2013}', '\u{2014}', '\u{2012}', '\u{2212}'], "-");
    let collapsed = HSPACE_RE.replace_all(&replaced, " ");
    NEWLINE_RE.replace_all(&collapsed, "\n").trim().to_string()
}

/// Heurística de estado, en orden:
/// sentencia dictada u orden final ⇒ `Closed`; alguna fecha pendiente ⇒ `Ongoing`;
/// términos de cierre ⇒ `Closed`; cualquier otro texto ⇒ `Ongoing`.
pub fn detect_status(text: &str, has_upcoming: bool) -> CaseStatus {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() || matches!(lower.as_str(), "unknown" | "n/a" | "na" | "none" | "-") {
        return if has_upcoming {
            CaseStatus::Ongoing
        } else {
            CaseStatus::Unknown
        };
    }

    let closed_phrase = (lower.contains("judgment") && lower.contains("delivered"))
        || (lower.contains("final order") && lower.contains("issued"));
    if closed_phrase {
        CaseStatus::Closed
    } else if has_upcoming {
        CaseStatus::Ongoing
    } else if CLOSED_RE.is_match(&lower) {
        CaseStatus::Closed
    } else {
        CaseStatus::Ongoing
    }
}

/// Fechas y estado; un caso cerrado no lleva recomendaciones.
fn settle_status(summary: &mut CaseSummary, status_text: &str, today: NaiveDate) {
    summary.classify_dates(today);
    summary.status = detect_status(status_text, summary.has_upcoming_dates());
    if summary.status == CaseStatus::Closed && !summary.recommendations.is_empty() {
        debug!("Caso cerrado: se descartan {} recomendaciones", summary.recommendations.len());
        summary.recommendations.clear();
    }
}

// ---------------------------------------------------------------------
// LOCALIZACIÓN DEL JSON
// ---------------------------------------------------------------------

/// Devuelve el objeto JSON encontrado y el texto en prosa que lo precede.
fn locate_json(text: &str) -> Option<(Map<String, Value>, &str)> {
    if let Some(object) = parse_object(text) {
        return Some((object, ""));
    }

    if let Some(caps) = FENCED_JSON_RE.captures(text) {
        if let (Some(fence), Some(body)) = (caps.get(0), caps.get(1)) {
            if let Some(object) = parse_object(body.as_str()) {
                return Some((object, text[..fence.start()].trim()));
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end]).map(|object| (object, text[..start].trim()))
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

// ---------------------------------------------------------------------
// RUTA JSON
// ---------------------------------------------------------------------

/// Lector de campos con claves insensibles a mayúsculas, `_`, `-` y espacios.
struct FieldReader<'a> {
    fields: BTreeMap<String, &'a Value>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .map(|(key, value)| (key_token(key), value))
            .collect();
        Self { fields }
    }

    /// Primer alias presente con valor no nulo.
    fn get(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|alias| self.fields.get(*alias).copied())
            .find(|value| !value.is_null())
    }
}

fn key_token(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn normalize_object(
    object: &Map<String, Value>,
    prose: &str,
    text: &str,
    today: NaiveDate,
) -> NormalizedSummary {
    let reader = FieldReader::new(object);
    let mut complete = true;
    let mut summary = CaseSummary::default();

    // Todas las cadenas del objeto: base para recuperar fechas y secciones ausentes.
    let mut strings = Vec::new();
    object.values().for_each(|v| collect_strings(v, &mut strings));
    let scan_text = strings.join("\n");

    summary.case_name = reader.get(CASE_NAME_KEYS).and_then(scalar_string).unwrap_or_default();
    summary.court_name = reader.get(COURT_KEYS).and_then(scalar_string).unwrap_or_default();
    summary.overview = reader
        .get(OVERVIEW_KEYS)
        .and_then(scalar_string)
        .unwrap_or_else(|| prose.to_string());

    match reader.get(PARTIES_KEYS).and_then(parties_from_value) {
        Some(parties) => summary.parties = parties,
        None => complete = false,
    }

    match reader.get(SECTIONS_KEYS).and_then(string_list) {
        Some(sections) => summary.sections_of_law = dedup_case_insensitive(sections),
        None => {
            complete = false;
            summary.sections_of_law = sections_from_text(&scan_text);
        }
    }

    match reader.get(HEARINGS_KEYS).and_then(hearing_dates_from_value) {
        Some((hearings, dropped)) => {
            if dropped > 0 {
                debug!("Descartadas {dropped} fechas de vista no interpretables");
                complete = false;
            }
            summary.hearing_dates = hearings;
        }
        None => {
            complete = false;
            summary.hearing_dates = hearing_dates_from_text(&scan_text);
        }
    }

    match reader.get(TIMELINE_KEYS).and_then(timeline_from_value) {
        Some(events) => summary.timeline = events,
        None => {
            complete = false;
            summary.timeline = timeline_from_hearings(&summary.hearing_dates);
        }
    }

    match reader.get(RECOMMENDATIONS_KEYS).and_then(string_list) {
        Some(recommendations) => summary.recommendations = recommendations,
        None => complete = false,
    }

    let status_text = match reader.get(STATUS_KEYS).and_then(scalar_string) {
        Some(status) => status,
        None => {
            complete = false;
            text.to_string()
        }
    };
    settle_status(&mut summary, &status_text, today);

    NormalizedSummary {
        summary,
        confidence: if complete {
            ParseConfidence::Full
        } else {
            ParseConfidence::Partial
        },
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Listas: array de cadenas, array de objetos (sus valores de texto) o cadena delimitada.
fn string_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::Object(map) => vec![object_label(map)],
                other => scalar_string(other).into_iter().collect(),
            })
            .collect(),
        Value::String(s) => s
            .split(['\n', ';'])
            .map(strip_bullet)
            .map(str::to_string)
            .collect(),
        _ => return None,
    };

    Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Claves que encabezan la etiqueta de un objeto de lista, en este orden.
const LEADING_KEYS: &[&str] = &["name", "party", "title", "recommendation", "tip", "step"];
const SECTION_NO_KEYS: &[&str] = &["section", "sectionnumber", "sec", "number"];
const ACT_KEYS: &[&str] = &["act", "statute", "code", "law"];

/// Etiqueta legible para un objeto dentro de una lista.
///
/// `{"section": "420", "act": "IPC"}` ⇒ "Section 420 IPC"; en otro caso las claves
/// conocidas van primero y el resto de valores detrás, separados por " - ".
fn object_label(map: &Map<String, Value>) -> String {
    let reader = FieldReader::new(map);

    if let Some(section) = reader.get(SECTION_NO_KEYS).and_then(scalar_string) {
        let section = if section.to_lowercase().starts_with("section") {
            section
        } else {
            format!("Section {section}")
        };
        return match reader.get(ACT_KEYS).and_then(scalar_string) {
            Some(act) if !act.is_empty() => format!("{section} {act}"),
            _ => section,
        };
    }

    let mut parts: Vec<String> = LEADING_KEYS
        .iter()
        .filter_map(|key| reader.fields.get(*key).copied())
        .filter_map(scalar_string)
        .collect();
    parts.extend(
        map.iter()
            .filter(|(key, _)| !LEADING_KEYS.contains(&key_token(key).as_str()))
            .filter_map(|(_, value)| scalar_string(value)),
    );
    parts.retain(|p| !p.is_empty());
    parts.join(" - ")
}

fn parties_from_value(value: &Value) -> Option<BTreeSet<String>> {
    let names: Vec<String> = match value {
        // {"Petitioner": "...", "Respondent": "..."}
        Value::Object(map) => map
            .values()
            .filter_map(|v| match v {
                Value::Array(_) => string_list(v),
                other => scalar_string(other).map(|s| vec![s]),
            })
            .flatten()
            .collect(),
        Value::String(s) => split_versus(s),
        other => string_list(other)?,
    };

    Some(
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect(),
    )
}

fn split_versus(text: &str) -> Vec<String> {
    if let Some(caps) = VERSUS_RE.captures(text) {
        return [caps.get(1), caps.get(2)]
            .into_iter()
            .flatten()
            .map(|m| m.as_str().trim().to_string())
            .collect();
    }
    text.split(['\n', ';', ','])
        .map(|s| s.trim().to_string())
        .collect()
}

/// Fechas de vista y número de entradas descartadas por fecha no interpretable.
fn hearing_dates_from_value(value: &Value) -> Option<(Vec<HearingDate>, usize)> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::String(_) | Value::Object(_) => vec![value],
        _ => return None,
    };

    let mut hearings = BTreeMap::new();
    let mut dropped = 0;

    for item in items {
        let (raw_date, description) = match item {
            Value::String(s) => (s.clone(), s.clone()),
            Value::Object(map) => {
                let reader = FieldReader::new(map);
                let raw_date = reader.get(&["date", "on", "when"]).and_then(scalar_string);
                let description = reader
                    .get(&["description", "purpose", "event", "details", "stage"])
                    .and_then(scalar_string)
                    .unwrap_or_default();
                match raw_date {
                    Some(d) => (d, description),
                    None => {
                        dropped += 1;
                        continue;
                    }
                }
            }
            _ => {
                dropped += 1;
                continue;
            }
        };

        match parse_date(&raw_date) {
            Some(date) => {
                hearings.entry(date).or_insert(description.trim().to_string());
            }
            None => dropped += 1,
        }
    }

    Some((into_hearings(hearings), dropped))
}

fn hearing_dates_from_text(text: &str) -> Vec<HearingDate> {
    let mut hearings = BTreeMap::new();
    for mention in find_dates(text) {
        hearings
            .entry(mention.date)
            .or_insert_with(|| snippet(text, mention.start, mention.end));
    }
    into_hearings(hearings)
}

fn into_hearings(map: BTreeMap<NaiveDate, String>) -> Vec<HearingDate> {
    map.into_iter()
        .map(|(date, description)| HearingDate::new(date, description))
        .collect()
}

fn timeline_from_value(value: &Value) -> Option<Vec<TimelineEvent>> {
    let Value::Array(items) = value else {
        return string_list(value).map(|lines| lines.iter().map(|l| timeline_line(l)).collect());
    };

    let events = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => {
                let reader = FieldReader::new(map);
                let date = reader
                    .get(&["date", "when"])
                    .and_then(scalar_string)
                    .and_then(|d| parse_date(&d))
                    .map(canonical)
                    .unwrap_or_default();
                let event = reader
                    .get(&["event", "description", "details", "eventcontext"])
                    .and_then(scalar_string)
                    .unwrap_or_default();
                Some(TimelineEvent {
                    date,
                    event,
                    status: None,
                })
            }
            other => scalar_string(other).map(|line| timeline_line(&line)),
        })
        .filter(|e| !e.event.is_empty() || !e.date.is_empty())
        .collect();

    Some(events)
}

fn timeline_line(line: &str) -> TimelineEvent {
    TimelineEvent {
        date: find_dates(line)
            .first()
            .map(|m| canonical(m.date))
            .unwrap_or_default(),
        event: line.trim().to_string(),
        status: None,
    }
}

fn timeline_from_hearings(hearings: &[HearingDate]) -> Vec<TimelineEvent> {
    hearings
        .iter()
        .map(|h| TimelineEvent {
            date: canonical(h.date),
            event: h.description.clone(),
            status: None,
        })
        .collect()
}

// ---------------------------------------------------------------------
// RUTA DE TEXTO LIBRE
// ---------------------------------------------------------------------

fn normalize_free_text(text: &str, today: NaiveDate) -> NormalizedSummary {
    let hearing_dates = hearing_dates_from_text(text);
    let mut summary = CaseSummary {
        overview: text.to_string(),
        parties: parties_from_text(text),
        sections_of_law: sections_from_text(text),
        timeline: timeline_from_hearings(&hearing_dates),
        hearing_dates,
        recommendations: recommendations_from_text(text),
        ..CaseSummary::default()
    };
    settle_status(&mut summary, text, today);

    NormalizedSummary {
        summary,
        confidence: ParseConfidence::Partial,
    }
}

/// Citas legales: "Section 420 IPC", "u/s 138 NI Act", "Franklin Penal Code 312(b)".
fn sections_from_text(text: &str) -> Vec<String> {
    let mut found = Vec::new();

    for caps in SECTION_RE.captures_iter(text) {
        let act = caps
            .name("act")
            .map(|m| collapse_spaces(m.as_str()))
            .unwrap_or_default();
        let Some(nums) = caps.name("nums") else { continue };
        for num in SECTION_NUM_RE.find_iter(nums.as_str()) {
            let label = if act.is_empty() {
                format!("Section {}", num.as_str())
            } else {
                format!("Section {} {}", num.as_str(), act)
            };
            found.push(label);
        }
    }

    for caps in CODE_RE.captures_iter(text) {
        if let (Some(title), Some(no)) = (caps.name("title"), caps.name("no")) {
            found.push(format!("{} {}", title.as_str().trim(), no.as_str()));
        }
    }

    dedup_case_insensitive(found)
}

fn collapse_spaces(act: &str) -> String {
    act.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parties_from_text(text: &str) -> BTreeSet<String> {
    let mut parties = BTreeSet::new();

    for caps in PARTY_LINE_RE.captures_iter(text) {
        if let Some(value) = caps.get(1) {
            for name in split_versus(value.as_str()) {
                let name = name.trim().trim_end_matches('.').to_string();
                if !name.is_empty() {
                    parties.insert(name);
                }
            }
        }
    }

    if parties.is_empty() {
        for line in text.lines() {
            if let Some(caps) = VERSUS_RE.captures(line) {
                for m in [caps.get(1), caps.get(2)].into_iter().flatten() {
                    parties.insert(m.as_str().trim().to_string());
                }
                break;
            }
        }
    }

    parties
}

/// Viñetas que siguen a un encabezado "Recommendations", "Tips" o "Next steps".
fn recommendations_from_text(text: &str) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut in_section = false;

    for line in text.lines() {
        if HEADING_RE.is_match(line) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        match BULLET_RE.captures(line).and_then(|c| c.get(1)) {
            Some(item) => recommendations.push(item.as_str().trim().to_string()),
            None if recommendations.is_empty() => continue,
            None => break,
        }
    }

    recommendations
}

fn strip_bullet(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'))
        .trim()
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn run(text: &str) -> NormalizedSummary {
        normalize_on(&RawModelResponse::new(text), today())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const FULL_RESPONSE: &str = r#"{
        "case_name": "State v. Rao",
        "court_name": "Sessions Court, Pune",
        "parties": ["State of Maharashtra", "Ravi Rao"],
        "sections_of_law": ["Section 420 IPC", "Section 468 IPC"],
        "hearing_dates": [
            {"date": "2024-07-19", "description": "Framing of charges"},
            {"date": "15 November 2024", "description": "Evidence"}
        ],
        "timeline": [
            {"date": "2023-02-01", "event": "FIR registered"},
            {"date": "2024-07-19", "event": "Charges framed"}
        ],
        "status": "Ongoing",
        "recommendations": ["Prepare witness list", "Secure bank records"],
        "overview": "Cheating case over forged invoices."
    }"#;

    #[test]
    fn complete_json_is_full_confidence() {
        let out = run(FULL_RESPONSE);
        assert_eq!(out.confidence, ParseConfidence::Full);
        let s = out.summary;
        assert_eq!(s.case_name, "State v. Rao");
        assert_eq!(s.court_name, "Sessions Court, Pune");
        assert!(s.parties.contains("Ravi Rao"));
        assert_eq!(s.sections_of_law, vec!["Section 420 IPC", "Section 468 IPC"]);
        assert_eq!(s.hearing_dates.len(), 2);
        assert_eq!(s.hearing_dates[1].date, ymd(2024, 11, 15));
        assert_eq!(s.timeline[0].date, "2023-02-01");
        assert_eq!(s.status, CaseStatus::Ongoing);
        assert_eq!(s.recommendations.len(), 2);
    }

    #[test]
    fn disposed_status_closes_the_case_and_yields_its_date() {
        let out = run(r#"{"status":"Case disposed on 2023-01-05"}"#);
        assert_eq!(out.summary.status, CaseStatus::Closed);
        assert_eq!(out.confidence, ParseConfidence::Partial);
        let dates: Vec<_> = out.summary.hearing_dates.iter().map(|h| h.date).collect();
        assert_eq!(dates, vec![ymd(2023, 1, 5)]);
        assert_eq!(canonical(dates[0]), "2023-01-05");
        assert_eq!(out.summary.hearing_dates[0].description, "Case disposed on 2023-01-05");
    }

    #[test]
    fn fenced_json_after_prose_keeps_the_prose_as_overview() {
        let text = "### Case Summary\nA cheque bounce dispute.\n\n```json\n{\"Case_Name\": \"A v. B\", \"Parties\": {\"Petitioner\": \"A\", \"Respondent\": \"B\"}, \"Sections_Invoked\": [\"Section 138 NI Act\"]}\n```";
        let out = run(text);
        assert_eq!(out.summary.case_name, "A v. B");
        assert!(out.summary.overview.contains("cheque bounce"));
        assert_eq!(
            out.summary.parties.iter().cloned().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
        assert_eq!(out.summary.sections_of_law, vec!["Section 138 NI Act"]);
        assert_eq!(out.confidence, ParseConfidence::Partial);
    }

    #[test]
    fn unparseable_hearing_dates_are_dropped_not_fatal() {
        let text = r#"{
            "parties": [], "sections_of_law": [], "timeline": [], "status": "pending",
            "recommendations": [],
            "hearing_dates": [{"date": "soon", "description": "TBD"}, "2025-03-10"]
        }"#;
        let out = run(text);
        assert_eq!(out.summary.hearing_dates.len(), 1);
        assert_eq!(out.summary.hearing_dates[0].date, ymd(2025, 3, 10));
        assert_eq!(out.confidence, ParseConfidence::Partial);
        assert_eq!(out.summary.status, CaseStatus::Ongoing);
    }

    #[test]
    fn wrongly_typed_fields_fall_back_to_defaults() {
        let out = run(r#"{"parties": 42, "sections_of_law": true, "status": null, "recommendations": {"a": 1}}"#);
        assert!(out.summary.parties.is_empty());
        assert_eq!(out.confidence, ParseConfidence::Partial);
    }

    #[test]
    fn free_text_is_mined_for_sections_dates_and_parties() {
        let text = "Petitioner: Asha Verma\nRespondent: Union of India\n\
                    The accused was booked u/s 420/468 IPC and under Franklin Penal Code 312(b).\n\
                    Next hearing on 19th July 2024.\n\
                    Recommendations:\n- Collect bank statements\n- Prepare witnesses\nEnd.";
        let out = run(text);
        let s = &out.summary;
        assert_eq!(out.confidence, ParseConfidence::Partial);
        assert!(s.parties.contains("Asha Verma"));
        assert!(s.parties.contains("Union of India"));
        assert_eq!(
            s.sections_of_law,
            vec!["Section 420 IPC", "Section 468 IPC", "Franklin Penal Code 312(b)"]
        );
        assert_eq!(s.hearing_dates[0].date, ymd(2024, 7, 19));
        assert_eq!(s.timeline[0].date, "2024-07-19");
        assert_eq!(s.recommendations, vec!["Collect bank statements", "Prepare witnesses"]);
        assert_eq!(s.status, CaseStatus::Ongoing);
    }

    #[test]
    fn empty_or_whitespace_responses_are_unknown() {
        for text in ["", "   \n\t "] {
            let out = run(text);
            assert_eq!(out.summary, CaseSummary::default());
            assert_eq!(out.summary.status, CaseStatus::Unknown);
            assert_eq!(out.confidence, ParseConfidence::Partial);
        }
    }

    #[test]
    fn arbitrary_garbage_never_panics() {
        let inputs = [
            "{",
            "}{",
            "{\"status\": ",
            "[1,2,3]",
            "```json\n{not json}\n```",
            "\u{0000}\u{FFFF}ü{{}}",
            "Section Section Section",
            "February 31-40, 2026",
            "null",
        ];
        for input in inputs {
            let out = run(input);
            assert_eq!(out.confidence, ParseConfidence::Partial, "input {input:?}");
        }
    }

    #[test]
    fn status_heuristic_recognizes_closing_terms() {
        assert_eq!(detect_status("Petition dismissed", false), CaseStatus::Closed);
        assert_eq!(detect_status("Judgment was delivered on 3 May", false), CaseStatus::Closed);
        assert_eq!(detect_status("Final order issued", false), CaseStatus::Closed);
        assert_eq!(detect_status("Listed for arguments", false), CaseStatus::Ongoing);
        assert_eq!(detect_status("Unknown", false), CaseStatus::Unknown);
        assert_eq!(detect_status("", false), CaseStatus::Unknown);
        assert_eq!(detect_status("", true), CaseStatus::Ongoing);
    }

    #[test]
    fn closing_terms_only_match_whole_words() {
        assert_eq!(detect_status("The accused disclosed the bank records", false), CaseStatus::Ongoing);
        assert_eq!(detect_status("Ongoing - matter undecided", false), CaseStatus::Ongoing);
        assert_eq!(detect_status("Documents enclosed with the petition", false), CaseStatus::Ongoing);
        assert_eq!(detect_status("Appeal DISMISSED with costs", false), CaseStatus::Closed);

        let out = run("The accused disclosed the bank records. Arguments heard on 19 July 2024.");
        assert_eq!(out.summary.status, CaseStatus::Ongoing);
        let out = run(r#"{"status":"Ongoing - matter undecided"}"#);
        assert_eq!(out.summary.status, CaseStatus::Ongoing);
    }

    #[test]
    fn upcoming_hearing_keeps_the_case_open() {
        let out = run("Interim bail application dismissed. Next hearing on 19 July 2030.");
        assert_eq!(out.summary.status, CaseStatus::Ongoing);
        assert_eq!(out.summary.hearing_dates[0].status, DateStatus::Upcoming);

        // Una sentencia dictada cierra el caso aunque queden fechas.
        assert_eq!(
            detect_status("Judgment delivered; compliance report due", true),
            CaseStatus::Closed
        );
    }

    #[test]
    fn closed_cases_carry_no_recommendations() {
        let out = run(r#"{"status":"Closed","recommendations":["Appeal within 30 days"]}"#);
        assert_eq!(out.summary.status, CaseStatus::Closed);
        assert!(out.summary.recommendations.is_empty());

        let out = run(r#"{"status":"Ongoing","recommendations":["Prepare witnesses"]}"#);
        assert_eq!(out.summary.recommendations, vec!["Prepare witnesses"]);
    }

    #[test]
    fn hearings_and_timeline_are_marked_past_or_upcoming() {
        let out = run(r#"{
            "hearing_dates": [
                {"date": "2025-06-01", "description": "Evidence"},
                {"date": "2026-03-10", "description": "Arguments"}
            ],
            "timeline": [
                {"date": "2025-06-01", "event": "Evidence recorded"},
                {"date": "", "event": "Counsel changed"},
                {"date": "2026-03-10", "event": "Arguments"}
            ]
        }"#);
        let s = &out.summary;
        assert_eq!(s.hearing_dates[0].status, DateStatus::Completed);
        assert_eq!(s.hearing_dates[1].status, DateStatus::Upcoming);
        assert_eq!(
            s.timeline.iter().map(|e| e.status).collect::<Vec<_>>(),
            vec![Some(DateStatus::Completed), None, Some(DateStatus::Upcoming)]
        );
        assert_eq!(s.status, CaseStatus::Ongoing);
    }

    #[test]
    fn list_objects_keep_a_readable_order() {
        let out = run(r#"{
            "sections_of_law": [{"section": "420", "act": "IPC"}, {"act": "NI Act", "section": "Section 138"}],
            "parties": [{"role": "Accused", "name": "Ravi Rao"}]
        }"#);
        assert_eq!(out.summary.sections_of_law, vec!["Section 420 IPC", "Section 138 NI Act"]);
        assert!(out.summary.parties.contains("Ravi Rao - Accused"));
    }

    #[test]
    fn clean_text_normalizes_dashes_and_spaces() {
        assert_eq!(clean_text("a\u{00A0}\u{2013} b \t c\n   d  "), "a - b c\nd");
    }

    #[test]
    fn keys_are_matched_loosely() {
        let out = run(r#"{"Sections-Invoked": "Section 302 IPC; Section 34 IPC", "CASE STATUS": "Closed"}"#);
        assert_eq!(out.summary.sections_of_law, vec!["Section 302 IPC", "Section 34 IPC"]);
        assert_eq!(out.summary.status, CaseStatus::Closed);
    }

    #[test]
    fn missing_timeline_is_derived_from_hearings() {
        let out = run(r#"{"hearing_dates": [{"date": "2024-01-02", "description": "Bail"}]}"#);
        assert_eq!(
            out.summary.timeline,
            vec![TimelineEvent {
                date: "2024-01-02".into(),
                event: "Bail".into(),
                status: Some(DateStatus::Completed),
            }]
        );
    }
}
