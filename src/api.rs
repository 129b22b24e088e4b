use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    app_state::AppState,
    auth::bearer_token,
    error::PipelineError,
    models::{CaseSummary, ParseConfidence, SummaryRecord, UploadedDocument},
};

// --- Respuestas de la API ---

/// Vista plana de un resumen para el frontend.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    document_id: String,
    filename: String,
    client_name: String,
    file_type: String,
    #[serde(flatten)]
    summary: CaseSummary,
    parse_confidence: ParseConfidence,
    truncated: bool,
    updated_at: String,
}

impl From<SummaryRecord> for SummaryView {
    fn from(record: SummaryRecord) -> Self {
        Self {
            document_id: record.document_id,
            filename: record.filename,
            client_name: record.client_name,
            file_type: record.file_type,
            summary: record.summary,
            parse_confidence: record.parse_confidence,
            truncated: record.truncated,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct SummariesResponse {
    summaries: Vec<SummaryView>,
}

/// Ficheros y metadatos recibidos en un formulario multipart.
#[derive(Default)]
struct UploadForm {
    files: Vec<(String, Vec<u8>)>,
    client_name: Option<String>,
    file_type: Option<String>,
    document_id: Option<String>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route(
            "/api/summaries",
            get(list_summaries_handler)
                .post(create_summaries_handler)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/summaries/:document_id", get(get_summary_handler))
        .route("/api/health", get(health_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn create_summaries_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<SummariesResponse>, PipelineError> {
    let user_id = state.pipeline.authenticate(bearer_token(&headers)).await?;
    let form = read_upload_form(multipart).await?;

    if form.files.is_empty() {
        return Err(PipelineError::BadRequest(
            "el formulario no contiene ningún fichero en 'files'".to_string(),
        ));
    }
    if form.document_id.is_some() && form.files.len() > 1 {
        return Err(PipelineError::BadRequest(
            "'document_id' sólo se admite con un único fichero".to_string(),
        ));
    }

    info!("Petición de resumen: usuario={} ficheros={}", user_id, form.files.len());

    let mut summaries = Vec::with_capacity(form.files.len());
    for (filename, bytes) in form.files {
        let upload = UploadedDocument {
            filename: filename.clone(),
            bytes,
            client_name: form.client_name.clone(),
            file_type: form.file_type.clone(),
            document_id: form.document_id.clone(),
        };
        let record = state.pipeline.process(&user_id, upload).await.map_err(|e| {
            error!("Error resumiendo '{}': {}", filename, e);
            e
        })?;
        summaries.push(SummaryView::from(record));
    }

    Ok(Json(SummariesResponse { summaries }))
}

#[axum::debug_handler]
async fn list_summaries_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SummariesResponse>, PipelineError> {
    let user_id = state.pipeline.authenticate(bearer_token(&headers)).await?;
    let records = state.pipeline.list(&user_id).await?;
    Ok(Json(SummariesResponse {
        summaries: records.into_iter().map(SummaryView::from).collect(),
    }))
}

#[axum::debug_handler]
async fn get_summary_handler(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SummaryView>, PipelineError> {
    let user_id = state.pipeline.authenticate(bearer_token(&headers)).await?;
    let record = state.pipeline.load(&user_id, &document_id).await?;
    Ok(Json(SummaryView::from(record)))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.pipeline.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": e.to_string() })),
        ),
    }
}

// --- Utilidades ---

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, PipelineError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::BadRequest(format!("multipart no válido: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "file" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "documento.pdf".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::BadRequest(format!("fichero ilegible: {e}")))?;
                form.files.push((filename, bytes.to_vec()));
            }
            "client_name" | "file_type" | "document_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PipelineError::BadRequest(format!("campo '{name}' ilegible: {e}")))?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "client_name" => form.client_name = Some(value),
                    "file_type" => form.file_type = Some(value),
                    _ => form.document_id = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::testing::test_config,
        llm::testing::ScriptedSummarizer,
        pipeline::testing::{harness, Harness, MODEL_JSON},
    };
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "court-mind-boundary";

    fn app(h: &Harness) -> Router {
        create_router(AppState {
            config: test_config(),
            pipeline: h.pipeline.clone(),
        })
    }

    /// Cuerpo multipart con un fichero por entrada de `files` y campos de texto opcionales.
    fn multipart_body(files: &[(&str, &[u8])], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (filename, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/summaries")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upload_without_bearer_is_rejected_before_any_work() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(&[("case.pdf", b"texto")], &[]);
        let response = app(&h).oneshot(upload_request(None, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["kind"], "unauthenticated");
        assert_eq!(h.extractor.calls(), 0);
        assert_eq!(h.summarizer.calls(), 0);
    }

    #[tokio::test]
    async fn upload_returns_flattened_summaries() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(
            &[("case.pdf", b"Sharma v. State")],
            &[("client_name", "R. Sharma"), ("document_id", "exp-1")],
        );
        let response = app(&h)
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let summary = &json["summaries"][0];
        assert_eq!(summary["documentId"], "exp-1");
        assert_eq!(summary["clientName"], "R. Sharma");
        assert_eq!(summary["caseName"], "Sharma v. State");
        assert_eq!(summary["status"], "Ongoing");
        assert_eq!(summary["parseConfidence"], "full");
        assert_eq!(summary["truncated"], false);
        assert_eq!(summary["hearingDates"][0]["date"], "2024-07-19");
    }

    #[tokio::test]
    async fn empty_file_is_unprocessable() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(&[("empty.pdf", b"")], &[]);
        let response = app(&h)
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["kind"], "extraction_error");
        assert_eq!(h.summarizer.calls(), 0);
    }

    #[tokio::test]
    async fn form_without_files_is_a_bad_request() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(&[], &[("client_name", "X")]);
        let response = app(&h)
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn document_id_with_several_files_is_a_bad_request() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(
            &[("a.pdf", b"uno"), ("b.pdf", b"dos")],
            &[("document_id", "exp-1")],
        );
        let response = app(&h)
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.extractor.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limited_upstream_maps_to_503() {
        let h = harness(ScriptedSummarizer::new(vec![
            crate::llm::testing::Step::Fail(PipelineError::UpstreamRateLimited("429".into())),
        ]));
        let body = multipart_body(&[("case.pdf", b"texto")], &[]);
        let response = app(&h)
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["kind"], "upstream_rate_limited");
    }

    #[tokio::test]
    async fn stored_summaries_can_be_fetched_and_listed() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let body = multipart_body(&[("case.pdf", b"texto")], &[("document_id", "exp-9")]);
        let router = app(&h);
        let response = router
            .clone()
            .oneshot(upload_request(Some("valid"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let one = router
            .clone()
            .oneshot(get_request("/api/summaries/exp-9", Some("valid")))
            .await
            .unwrap();
        assert_eq!(one.status(), StatusCode::OK);
        assert_eq!(json_body(one).await["documentId"], "exp-9");

        let all = router
            .oneshot(get_request("/api/summaries", Some("valid")))
            .await
            .unwrap();
        assert_eq!(json_body(all).await["summaries"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_document_is_404() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let response = app(&h)
            .oneshot(get_request("/api/summaries/nada", Some("valid")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "not_found");
    }

    #[tokio::test]
    async fn health_reports_ok_when_the_store_answers() {
        let h = harness(ScriptedSummarizer::replying(MODEL_JSON));
        let response = app(&h)
            .oneshot(get_request("/api/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }
}
