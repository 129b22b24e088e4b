use crate::config::AppConfig;
use anyhow::{Context, Result};
use neo4rs::{query, Graph};
use tracing::info;
use url::Url;

pub async fn connect_from_config(cfg: &AppConfig) -> Result<Graph> {
    let url = Url::parse(&cfg.neo4j_uri)
        .with_context(|| format!("NEO4J_URI no es una URL válida: {}", cfg.neo4j_uri))?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    let addr = format!("{host}:{port}");

    info!("Conectando a Neo4j en {addr}...");
    let graph = Graph::new(&addr, &cfg.neo4j_user, &cfg.neo4j_password).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

/// Crea los constraints de :User y :CaseSummary.
pub async fn ensure_schema(graph: &Graph) -> Result<()> {
    let statements = [
        "CREATE CONSTRAINT user_id IF NOT EXISTS
         FOR (u:User)
         REQUIRE u.id IS UNIQUE",
        // Un resumen por usuario y documento.
        "CREATE CONSTRAINT case_summary_key IF NOT EXISTS
         FOR (s:CaseSummary)
         REQUIRE (s.user_id, s.document_id) IS UNIQUE",
        "CREATE INDEX case_summary_updated IF NOT EXISTS
         FOR (s:CaseSummary)
         ON (s.updated_at)",
    ];

    for stmt in statements {
        graph
            .run(query(stmt))
            .await
            .with_context(|| format!("Fallo al ejecutar: {}", stmt.lines().next().unwrap_or(stmt)))?;
    }

    info!("Esquema de Neo4j asegurado (constraints de resúmenes creados).");
    Ok(())
}
