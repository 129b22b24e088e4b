//! Extracción de texto por páginas a partir de los bytes de un PDF.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::{error::PipelineError, models::ExtractedText};

/// Extractor de texto síncrono. El pipeline lo ejecuta en el pool bloqueante.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, PipelineError>;
}

/// Implementación basada en `pdf-extract`.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::Extraction("el fichero está vacío".to_string()));
        }
        if !looks_like_pdf(bytes) {
            return Err(PipelineError::Extraction(
                "el fichero no es un PDF".to_string(),
            ));
        }

        // pdf-extract puede entrar en pánico con PDFs corruptos.
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        let pages = match parsed {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                warn!("pdf-extract rechazó el documento: {}", e);
                return Err(PipelineError::Extraction(format!(
                    "PDF corrupto, cifrado o no soportado: {e}"
                )));
            }
            Err(_) => {
                warn!("pdf-extract entró en pánico procesando el documento");
                return Err(PipelineError::Extraction(
                    "PDF corrupto o no soportado".to_string(),
                ));
            }
        };

        ensure_text(pages)
    }
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    // La cabecera puede ir precedida de basura; los lectores toleran hasta 1 KiB.
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Rechaza documentos sin ningún texto útil (p. ej. escaneados sin OCR).
fn ensure_text(pages: Vec<String>) -> Result<ExtractedText, PipelineError> {
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(PipelineError::Extraction(
            "el PDF no contiene texto extraíble".to_string(),
        ));
    }
    debug!("Extraídas {} páginas de texto", pages.len());
    Ok(ExtractedText::new(pages))
}
