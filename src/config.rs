//! Carga y gestión de configuración de la aplicación (Neo4j + LLM + identidad).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    /// Modelo de chat por defecto de cada proveedor.
    pub fn default_chat_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Gemini => "gemini-2.5-flash",
            Self::Ollama => "llama3.1",
        }
    }

    /// Variable de entorno con la clave de API del proveedor.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Parámetros del constructor de prompts.
#[derive(Clone, Debug, PartialEq)]
pub struct PromptConfig {
    /// Máximo de caracteres de texto del documento que se envían al modelo.
    pub char_budget: usize,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            char_budget: 60_000,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// Política de reintentos hacia el servicio de resumen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            max_retries: 1,
            backoff: Duration::from_millis(1500),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub server_addr: String,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    /// Clave del proveedor; vacía para Ollama.
    pub llm_api_key: String,
    pub ollama_base_url: String,
    pub prompt: PromptConfig,
    pub retry: RetryPolicy,

    pub firebase_api_key: String,
    pub identity_endpoint: String,

    pub max_upload_bytes: usize,
    pub frontend_dir: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let neo4j_uri = required("NEO4J_URI")?;
        let neo4j_user = required("NEO4J_USER")?;
        let neo4j_password = required("NEO4J_PASSWORD")?;

        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3322".to_string());

        let llm_provider_str =
            env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let llm_api_key = match llm_provider.api_key_var() {
            Some(key_var) => required(key_var)?,
            None => String::new(),
        };
        let ollama_base_url = env::var("OLLAMA_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());

        let llm_chat_model = env::var("LLM_CHAT_MODEL")
            .unwrap_or_else(|_| llm_provider.default_chat_model().to_string());

        let prompt_defaults = PromptConfig::default();
        let prompt = PromptConfig {
            char_budget: parse_or(
                "PROMPT_CHAR_BUDGET",
                env::var("PROMPT_CHAR_BUDGET").ok(),
                prompt_defaults.char_budget,
            )?,
            temperature: parse_or(
                "LLM_TEMPERATURE",
                env::var("LLM_TEMPERATURE").ok(),
                prompt_defaults.temperature,
            )?,
            max_tokens: parse_or(
                "LLM_MAX_TOKENS",
                env::var("LLM_MAX_TOKENS").ok(),
                prompt_defaults.max_tokens,
            )?,
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            timeout: Duration::from_secs(parse_or(
                "LLM_TIMEOUT_SECS",
                env::var("LLM_TIMEOUT_SECS").ok(),
                retry_defaults.timeout.as_secs(),
            )?),
            max_retries: parse_or(
                "LLM_MAX_RETRIES",
                env::var("LLM_MAX_RETRIES").ok(),
                retry_defaults.max_retries,
            )?,
            backoff: Duration::from_millis(parse_or(
                "LLM_RETRY_BACKOFF_MS",
                env::var("LLM_RETRY_BACKOFF_MS").ok(),
                retry_defaults.backoff.as_millis() as u64,
            )?),
        };

        let firebase_api_key = required("FIREBASE_API_KEY")?;
        let identity_endpoint = env::var("IDENTITY_ENDPOINT")
            .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com".to_string());

        let max_upload_bytes = parse_or(
            "MAX_UPLOAD_BYTES",
            env::var("MAX_UPLOAD_BYTES").ok(),
            25 * 1024 * 1024,
        )?;
        let frontend_dir = env::var("FRONTEND_DIR").unwrap_or_else(|_| "frontend".to_string());

        Ok(Self {
            neo4j_uri,
            neo4j_user,
            neo4j_password,
            server_addr,
            llm_provider,
            llm_chat_model,
            llm_api_key,
            ollama_base_url,
            prompt,
            retry,
            firebase_api_key,
            identity_endpoint,
            max_upload_bytes,
            frontend_dir,
        })
    }
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!("Falta {key} en el entorno")),
    }
}

/// Interpreta el valor de una variable opcional, usando `default` si no está definida.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Valor no válido para {key} ('{value}'): {e}")),
    }
}
