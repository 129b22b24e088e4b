//! Orquestación de una subida: identidad → extracción → petición → resumen → normalización → almacén.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{
    auth::IdentityVerifier,
    config::{PromptConfig, RetryPolicy},
    error::PipelineError,
    extract::TextExtractor,
    llm::{summarize_with_retry, Summarizer},
    models::{ParseConfidence, SummaryRecord, UploadedDocument},
    normalize::normalize,
    prompt::build_request,
    store::SummaryStore,
};

/// Componentes del pipeline, construidos una vez al arrancar.
pub struct Pipeline {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub extractor: Arc<dyn TextExtractor>,
    pub summarizer: Arc<dyn Summarizer>,
    pub store: Arc<dyn SummaryStore>,
    pub prompt: PromptConfig,
    pub retry: RetryPolicy,
}

impl Pipeline {
    /// Verifica la credencial antes de hacer cualquier trabajo.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<String, PipelineError> {
        let token = credential.ok_or(PipelineError::Unauthenticated)?;
        self.verifier.verify(token).await
    }

    pub async fn process(
        &self,
        user_id: &str,
        upload: UploadedDocument,
    ) -> Result<SummaryRecord, PipelineError> {
        let document_id = match upload.document_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => content_id(&upload.bytes),
        };
        info!(
            "📄 Procesando '{}' ({} bytes) como documento {}",
            upload.filename,
            upload.bytes.len(),
            document_id
        );

        let extractor = Arc::clone(&self.extractor);
        let bytes = upload.bytes;
        let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| PipelineError::Extraction(format!("tarea de extracción abortada: {e}")))??;

        let request = build_request(&text, &self.prompt);
        if request.truncated {
            warn!(
                "Documento {} recortado al presupuesto: {} de {} páginas",
                document_id,
                request.pages_included,
                text.pages.len()
            );
        }

        let raw = summarize_with_retry(self.summarizer.as_ref(), &request, &self.retry).await?;
        let normalized = normalize(&raw);

        let record = SummaryRecord {
            user_id: user_id.to_string(),
            document_id,
            filename: upload.filename,
            client_name: upload.client_name.unwrap_or_default(),
            file_type: upload.file_type.unwrap_or_default(),
            summary: normalized.summary,
            parse_confidence: normalized.confidence,
            truncated: request.truncated,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        self.store.save(&record).await?;

        info!(
            "✅ Resumen listo para {} (confianza: {})",
            record.document_id,
            if record.parse_confidence == ParseConfidence::Full { "full" } else { "partial" }
        );
        Ok(record)
    }

    pub async fn load(&self, user_id: &str, document_id: &str) -> Result<SummaryRecord, PipelineError> {
        self.store.load(user_id, document_id).await
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<SummaryRecord>, PipelineError> {
        self.store.list(user_id).await
    }
}

/// SHA-256 hexadecimal del contenido subido.
fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
