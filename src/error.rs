//! Taxonomía de errores de una petición del pipeline y su traducción a HTTP.
//!
//! La normalización parcial NO aparece aquí: es un resultado válido
//! (`ParseConfidence::Partial`), no un error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Credencial ausente o no válida")]
    Unauthenticated,

    #[error("No se pudo extraer texto del documento: {0}")]
    Extraction(String),

    #[error("El servicio de resumen no está disponible: {0}")]
    UpstreamUnavailable(String),

    #[error("El servicio de resumen ha limitado las peticiones: {0}")]
    UpstreamRateLimited(String),

    #[error("El servicio de resumen ha rechazado el contenido: {0}")]
    UpstreamRejected(String),

    #[error("No existe ningún resumen para ese documento")]
    NotFound,

    #[error("Petición no válida: {0}")]
    BadRequest(String),

    #[error("Error en el almacén de resúmenes: {0}")]
    Store(String),
}

impl PipelineError {
    /// Identificador estable del tipo de error para el frontend.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Extraction(_) => "extraction_error",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamRateLimited(_) => "upstream_rate_limited",
            Self::UpstreamRejected(_) => "upstream_rejected",
            Self::NotFound => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Store(_) => "store_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamUnavailable(_) | Self::UpstreamRateLimited(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UpstreamRejected(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<neo4rs::Error> for PipelineError {
    fn from(err: neo4rs::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(format!("payload no serializable: {err}"))
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(json!({ "error": self.to_string(), "kind": self.kind() })),
        )
            .into_response()
    }
}
