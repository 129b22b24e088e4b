//! Verificación de credenciales Bearer contra el proveedor de identidad (Firebase).
//!
//! La verificación criptográfica se delega por completo en el proveedor; aquí
//! sólo se exige que exista un identificador de usuario antes de cualquier trabajo.

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::PipelineError;

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Devuelve el identificador del usuario al que pertenece la credencial.
    async fn verify(&self, token: &str) -> Result<String, PipelineError>;
}

/// Extrae el token de la cabecera `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verificador basado en el endpoint `accounts:lookup` de Identity Toolkit.
#[derive(Debug, Clone)]
pub struct FirebaseVerifier {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId", default)]
    local_id: String,
}

impl FirebaseVerifier {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn lookup_url(&self) -> String {
        format!("{}/v1/accounts:lookup", self.endpoint)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<String, PipelineError> {
        let response = self
            .http
            .post(self.lookup_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| {
                warn!("No se pudo contactar con el proveedor de identidad: {}", e);
                PipelineError::Unauthenticated
            })?;

        if !response.status().is_success() {
            warn!("Token rechazado por el proveedor de identidad ({})", response.status());
            return Err(PipelineError::Unauthenticated);
        }

        let body: LookupResponse = response.json().await.map_err(|e| {
            warn!("Respuesta de identidad no válida: {}", e);
            PipelineError::Unauthenticated
        })?;

        body.users
            .into_iter()
            .map(|u| u.local_id)
            .find(|id| !id.is_empty())
            .ok_or(PipelineError::Unauthenticated)
    }
}
