//! Abstracción sobre Rig para pedir el resumen estructurado a distintos proveedores de LLM,
//! con timeout por intento y reintento acotado ante indisponibilidad.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rig::client::CompletionClient as _;
use rig::completion::Prompt;
use rig::providers::{gemini, ollama, openai};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::{
    config::{AppConfig, LlmProvider, RetryPolicy},
    error::PipelineError,
    models::{RawModelResponse, SummaryRequest},
};

/// Cliente del servicio de resumen.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, request: &SummaryRequest) -> Result<RawModelResponse, PipelineError>;
}

/// Cliente de Rig ya autenticado, uno por proveedor.
#[derive(Clone)]
enum ChatClient {
    OpenAI(openai::Client),
    Gemini(gemini::Client),
    Ollama(ollama::Client),
}

/// Gestor de LLMs. El cliente se construye una vez con las credenciales de `AppConfig`.
#[derive(Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
    client: ChatClient,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let chat_model = if cfg.llm_chat_model.trim().is_empty() {
            cfg.llm_provider.default_chat_model().to_string()
        } else {
            cfg.llm_chat_model.clone()
        };

        let needs_key = cfg.llm_provider.api_key_var().is_some();
        if needs_key && cfg.llm_api_key.trim().is_empty() {
            return Err(anyhow!("Falta la clave de API para {:?}", cfg.llm_provider));
        }

        let client = match cfg.llm_provider {
            LlmProvider::OpenAI => ChatClient::OpenAI(openai::Client::new(&cfg.llm_api_key)),
            LlmProvider::Gemini => ChatClient::Gemini(
                gemini::Client::builder(&cfg.llm_api_key)
                    .build()
                    .context("No se pudo crear el cliente de Gemini")?,
            ),
            LlmProvider::Ollama => ChatClient::Ollama(
                ollama::Client::builder()
                    .base_url(&cfg.ollama_base_url)
                    .build(),
            ),
        };

        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model,
            client,
        })
    }

    async fn prompt(&self, request: &SummaryRequest) -> Result<String> {
        let reply = match &self.client {
            ChatClient::OpenAI(client) => {
                let agent = client
                    .agent(&self.chat_model)
                    .preamble(&request.preamble)
                    .temperature(request.temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(request.document.as_str()).await?
            }
            ChatClient::Gemini(client) => {
                let agent = client
                    .agent(&self.chat_model)
                    .preamble(&request.preamble)
                    .temperature(request.temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(request.document.as_str()).await?
            }
            ChatClient::Ollama(client) => {
                let agent = client
                    .agent(&self.chat_model)
                    .preamble(&request.preamble)
                    .temperature(request.temperature)
                    .max_tokens(request.max_tokens)
                    .build();
                agent.prompt(request.document.as_str()).await?
            }
        };
        Ok(reply)
    }
}

#[async_trait]
impl Summarizer for LlmManager {
    async fn complete(&self, request: &SummaryRequest) -> Result<RawModelResponse, PipelineError> {
        let text = self
            .prompt(request)
            .await
            .map_err(|e| classify_upstream_error(&format!("{e:#}")))?;
        if text.trim().is_empty() {
            return Err(PipelineError::UpstreamRejected(
                "el modelo devolvió una respuesta vacía".to_string(),
            ));
        }
        Ok(RawModelResponse::new(text))
    }
}

/// Clasifica un error del proveedor a partir de su mensaje.
///
/// Los proveedores no comparten tipos de error, así que se buscan las marcas
/// conocidas de cuota y de filtro de contenido; el resto se considera caída.
pub fn classify_upstream_error(message: &str) -> PipelineError {
    let lower = message.to_lowercase();

    const RATE_LIMIT_MARKERS: &[&str] = &[
        "429",
        "rate limit",
        "rate_limit",
        "quota",
        "resource_exhausted",
        "too many requests",
    ];
    const REJECTED_MARKERS: &[&str] = &[
        "safety",
        "content_filter",
        "content policy",
        "content management policy",
        "blocked",
        "prohibited_content",
        "recitation",
    ];

    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        PipelineError::UpstreamRateLimited(message.to_string())
    } else if REJECTED_MARKERS.iter().any(|m| lower.contains(m)) {
        PipelineError::UpstreamRejected(message.to_string())
    } else {
        PipelineError::UpstreamUnavailable(message.to_string())
    }
}

/// Llama al servicio de resumen con timeout por intento.
///
/// Sólo `UpstreamUnavailable` se reintenta, como mucho `policy.max_retries` veces
/// y con espera exponencial a partir de `policy.backoff`.
pub async fn summarize_with_retry(
    summarizer: &dyn Summarizer,
    request: &SummaryRequest,
    policy: &RetryPolicy,
) -> Result<RawModelResponse, PipelineError> {
    let mut attempt: u32 = 0;

    loop {
        let outcome = match timeout(policy.timeout, summarizer.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::UpstreamUnavailable(format!(
                "sin respuesta tras {}s",
                policy.timeout.as_secs_f32()
            ))),
        };

        match outcome {
            Err(PipelineError::UpstreamUnavailable(reason)) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = backoff_delay(policy.backoff, attempt);
                warn!(
                    "Servicio de resumen no disponible ({}); reintento {}/{} en {:?}",
                    reason, attempt, policy.max_retries, delay
                );
                sleep(delay).await;
            }
            Ok(response) => {
                if attempt > 0 {
                    info!("Resumen obtenido tras {} reintento(s)", attempt);
                }
                return Ok(response);
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}
