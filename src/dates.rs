//! Reconocimiento y normalización de fechas en el texto devuelto por el LLM.
//!
//! Todas las fechas se convierten a `NaiveDate` y se presentan como `YYYY-MM-DD`.
//! Las cadenas que no se pueden interpretar devuelven `None`; nunca abortan.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

const MONTHS: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
const ORDINAL: &str = r"(?:st|nd|rd|th)?";

/// Formatos probados en orden; el día va antes que el mes en las formas numéricas.
const DAY_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %B %Y",
    "%B %d %Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%m.%d.%Y",
    "%Y/%m/%d",
];

const CONTEXT_BEFORE: usize = 120;
const CONTEXT_AFTER: usize = 160;

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(&format!(
        r"(?i)\b(?:(?P<rmonth>{m})\.?\s+(?P<rd1>\d{{1,2}}){o}\s*-\s*(?P<rd2>\d{{1,2}}){o},?\s+(?P<ryear>\d{{4}})|\d{{1,2}}{o}\s+(?:of\s+)?{m}\.?,?\s+\d{{4}}|{m}\.?\s+\d{{1,2}}{o},?\s+\d{{4}}|{m}\.?,?\s+\d{{4}}|\d{{4}}-\d{{1,2}}-\d{{1,2}}(?:T\d{{2}}:\d{{2}}(?::\d{{2}}(?:\.\d+)?)?(?:Z|[+-]\d{{2}}:?\d{{2}})?)?|\d{{1,2}}[/.\-]\d{{1,2}}[/.\-]\d{{4}})\b",
        m = MONTHS,
        o = ORDINAL
    ))
    .unwrap();
    static ref ORDINAL_RE: Regex = Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)\b").unwrap();
    static ref OF_RE: Regex = Regex::new(r"(?i)\s+of\s+").unwrap();
    static ref SEPT_RE: Regex = Regex::new(r"(?i)\bsept\b").unwrap();
    static ref ABBREV_DOT_RE: Regex = Regex::new(r"([A-Za-z])\.").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref MONTH_YEAR_RE: Regex =
        Regex::new(&format!(r"(?i)^{MONTHS}\s+\d{{4}}$")).unwrap();
}

/// Una fecha reconocida dentro de un texto, con su posición en bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMention {
    pub date: NaiveDate,
    pub start: usize,
    pub end: usize,
}

/// Representación canónica usada en todo el servicio.
pub fn canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Interpreta una única fecha escrita en cualquiera de los formatos aceptados.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Como último recurso, una fecha incrustada en una frase ("disposed on 5 Jan 2023").
    parse_single(raw).or_else(|| find_dates(raw).into_iter().next().map(|m| m.date))
}

/// Busca todas las fechas de un texto, expandiendo rangos como "February 5-12, 2026".
pub fn find_dates(text: &str) -> Vec<DateMention> {
    let mut found = Vec::new();

    for caps in DATE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (start, end) = (whole.start(), whole.end());

        if let (Some(month), Some(d1), Some(d2), Some(year)) = (
            caps.name("rmonth"),
            caps.name("rd1"),
            caps.name("rd2"),
            caps.name("ryear"),
        ) {
            for day in [d1.as_str(), d2.as_str()] {
                let single = format!("{} {} {}", month.as_str(), day, year.as_str());
                if let Some(date) = parse_single(&single) {
                    found.push(DateMention { date, start, end });
                }
            }
            continue;
        }

        if let Some(date) = parse_single(whole.as_str()) {
            found.push(DateMention { date, start, end });
        }
    }

    found
}

/// Fragmento de texto alrededor de una mención, limitado a la línea en la que aparece.
pub fn snippet(text: &str, start: usize, end: usize) -> String {
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[end..].find('\n').map(|i| end + i).unwrap_or(text.len());

    let mut before: Vec<char> = text[line_start..start]
        .chars()
        .rev()
        .take(CONTEXT_BEFORE)
        .collect();
    before.reverse();
    let before: String = before.into_iter().collect();
    let after: String = text[end..line_end].chars().take(CONTEXT_AFTER).collect();

    format!("{before}{}{after}", &text[start..end]).trim().to_string()
}

/// Interpreta la cadena completa como una sola fecha.
fn parse_single(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean_date_text(raw);
    if cleaned.is_empty() {
        return None;
    }
    for fmt in DAY_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            if plausible(date) {
                return Some(date);
            }
        }
    }
    // "March 2026" → primer día del mes.
    if MONTH_YEAR_RE.is_match(&cleaned) {
        return NaiveDate::parse_from_str(&format!("1 {cleaned}"), "%d %B %Y")
            .ok()
            .filter(|d| plausible(*d));
    }
    None
}

fn clean_date_text(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    // Fecha y hora ISO: nos quedamos con la fecha.
    let bytes = text.as_bytes();
    if bytes.len() > 10 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[10] == b'T' {
        text.truncate(10);
    }

    let text = ORDINAL_RE.replace_all(&text, "$1");
    let text = OF_RE.replace_all(&text, " ");
    let text = SEPT_RE.replace_all(&text, "Sep");
    let text = ABBREV_DOT_RE.replace_all(&text, "$1");
    let text = text.replace(',', " ");
    SPACES_RE.replace_all(text.trim(), " ").into_owned()
}

fn plausible(date: NaiveDate) -> bool {
    (1800..=2200).contains(&date.year())
}
