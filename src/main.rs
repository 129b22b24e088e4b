// Módulos de la aplicación
mod api;
mod app_state;
mod auth;
mod config;
mod dates;
mod error;
mod extract;
mod llm;
mod models;
mod neo4j_client;
mod normalize;
mod pipeline;
mod prompt;
mod store;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    app_state::AppState, auth::FirebaseVerifier, extract::PdfTextExtractor, llm::LlmManager,
    pipeline::Pipeline, store::Neo4jSummaryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Conectar a Neo4j y asegurar esquemas
    let graph = neo4j_client::connect_from_config(&cfg)
        .await
        .context("Error conectando a Neo4j")?;
    neo4j_client::ensure_schema(&graph)
        .await
        .context("Error asegurando el esquema de Neo4j")?;

    // 4. Inicializar gestor de LLMs
    let llm_manager = LlmManager::from_config(&cfg).context("Error inicializando LLM Manager")?;
    info!(
        "LLM: proveedor={:?} modelo={}",
        llm_manager.provider, llm_manager.chat_model
    );

    // 5. Montar el pipeline y el estado compartido
    let pipeline = Pipeline {
        verifier: Arc::new(FirebaseVerifier::new(
            cfg.identity_endpoint.clone(),
            cfg.firebase_api_key.clone(),
        )),
        extractor: Arc::new(PdfTextExtractor),
        summarizer: Arc::new(llm_manager),
        store: Arc::new(Neo4jSummaryStore::new(Arc::new(graph))),
        prompt: cfg.prompt.clone(),
        retry: cfg.retry.clone(),
    };
    let app_state = AppState {
        config: cfg.clone(),
        pipeline: Arc::new(pipeline),
    };

    // 6. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .fallback_service(ServeDir::new(&cfg.frontend_dir))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 7. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error sirviendo peticiones")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
