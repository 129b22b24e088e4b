//! Construcción determinista de la petición de resumen a partir del texto extraído.

use crate::{
    config::PromptConfig,
    models::{ExtractedText, SummaryRequest, PAGE_SEPARATOR},
};

/// Instrucciones fijas. Los nombres de clave coinciden con los que acepta el normalizador.
pub const SUMMARY_INSTRUCTIONS: &str = r#"
You are a legal document summarizer for court case files.
Read the document supplied by the user and extract the following fields:

- case_name: short title of the case.
- court_name: court or tribunal hearing the matter.
- parties: list of every party (petitioner, respondent, accused, complainant, ...).
- sections_of_law: list of statutory sections invoked, with full references (e.g. "Section 420 IPC").
- hearing_dates: list of objects {"date": "YYYY-MM-DD", "description": "..."} for hearings, orders and deadlines.
- timeline: list of objects {"date": "YYYY-MM-DD", "event": "..."} in chronological order.
- status: "Ongoing" or "Closed" (use "Closed" only when the case is disposed, dismissed or decided).
- recommendations: 3 to 5 concrete, actionable next steps for counsel if the case is ongoing; empty list otherwise.
- overview: a concise plain-language summary of the facts and the current stage.

Answer with a single valid JSON object using exactly those keys and nothing else.
Use empty strings or empty lists for anything the document does not state. Never invent dates.
"#;

/// Construye la petición aplicando el presupuesto de caracteres.
///
/// Si el texto completo excede `char_budget` se recortan las páginas finales
/// y `truncated` queda a `true`; el recorte nunca es silencioso.
pub fn build_request(text: &ExtractedText, cfg: &PromptConfig) -> SummaryRequest {
    let truncated = text.combined_len() > cfg.char_budget;

    let (document, pages_included) = if truncated {
        cut_to_budget(text, cfg.char_budget)
    } else {
        (text.joined(), text.pages.len())
    };

    SummaryRequest {
        preamble: SUMMARY_INSTRUCTIONS.trim().to_string(),
        document,
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
        truncated,
        pages_included,
    }
}

fn cut_to_budget(text: &ExtractedText, budget: usize) -> (String, usize) {
    let mut document = String::new();
    let mut remaining = budget;
    let mut pages_included = 0;

    for (idx, page) in text.pages.iter().enumerate() {
        if idx > 0 {
            let sep_len = PAGE_SEPARATOR.chars().count();
            if remaining <= sep_len {
                break;
            }
            document.push_str(PAGE_SEPARATOR);
            remaining -= sep_len;
        }

        let page_len = page.chars().count();
        if page_len <= remaining {
            document.push_str(page);
            remaining -= page_len;
            pages_included += 1;
        } else {
            document.extend(page.chars().take(remaining));
            if remaining > 0 {
                pages_included += 1;
            }
            break;
        }
    }

    (document, pages_included)
}
