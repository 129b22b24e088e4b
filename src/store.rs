//! Persistencia de resúmenes por `(user_id, document_id)`.

use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{query, Graph};
use tracing::{error, info};

use crate::{error::PipelineError, models::SummaryRecord};

#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserta o sobrescribe el registro del par `(user_id, document_id)`.
    async fn save(&self, record: &SummaryRecord) -> Result<(), PipelineError>;

    async fn load(&self, user_id: &str, document_id: &str) -> Result<SummaryRecord, PipelineError>;

    /// Registros del usuario, el más reciente primero.
    async fn list(&self, user_id: &str) -> Result<Vec<SummaryRecord>, PipelineError>;

    async fn ping(&self) -> Result<(), PipelineError>;
}

/// Almacén sobre Neo4j: `(:User)-[:OWNS]->(:CaseSummary)` con el registro serializado en `payload`.
#[derive(Clone)]
pub struct Neo4jSummaryStore {
    graph: Arc<Graph>,
}

impl Neo4jSummaryStore {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl SummaryStore for Neo4jSummaryStore {
    async fn save(&self, record: &SummaryRecord) -> Result<(), PipelineError> {
        let payload = serde_json::to_string(record)?;

        let q = query(
            "MERGE (u:User {id: $user_id})
             MERGE (s:CaseSummary {user_id: $user_id, document_id: $document_id})
             MERGE (u)-[:OWNS]->(s)
             SET s.filename = $filename,
                 s.client_name = $client_name,
                 s.file_type = $file_type,
                 s.case_name = $case_name,
                 s.status = $status,
                 s.parse_confidence = $parse_confidence,
                 s.truncated = $truncated,
                 s.updated_at = $updated_at,
                 s.payload = $payload",
        )
        .param("user_id", record.user_id.as_str())
        .param("document_id", record.document_id.as_str())
        .param("filename", record.filename.as_str())
        .param("client_name", record.client_name.as_str())
        .param("file_type", record.file_type.as_str())
        .param("case_name", record.summary.case_name.as_str())
        .param("status", format!("{:?}", record.summary.status))
        .param("parse_confidence", format!("{:?}", record.parse_confidence).to_lowercase())
        .param("truncated", record.truncated)
        .param("updated_at", record.updated_at.as_str())
        .param("payload", payload);

        self.graph.run(q).await.map_err(|e| {
            error!("Error guardando el resumen {}: {}", record.document_id, e);
            PipelineError::from(e)
        })?;

        info!(
            "Resumen guardado: usuario={} documento={}",
            record.user_id, record.document_id
        );
        Ok(())
    }

    async fn load(&self, user_id: &str, document_id: &str) -> Result<SummaryRecord, PipelineError> {
        let mut cursor = self
            .graph
            .execute(
                query(
                    "MATCH (:User {id: $user_id})-[:OWNS]->(s:CaseSummary {document_id: $document_id})
                     RETURN s.payload AS payload
                     LIMIT 1",
                )
                .param("user_id", user_id)
                .param("document_id", document_id),
            )
            .await?;

        match cursor.next().await? {
            Some(row) => {
                let payload: String = row
                    .get("payload")
                    .ok_or_else(|| PipelineError::Store("resumen sin payload".to_string()))?;
                Ok(serde_json::from_str(&payload)?)
            }
            None => Err(PipelineError::NotFound),
        }
    }

    async fn list(&self, user_id: &str) -> Result<Vec<SummaryRecord>, PipelineError> {
        let mut cursor = self
            .graph
            .execute(
                query(
                    "MATCH (:User {id: $user_id})-[:OWNS]->(s:CaseSummary)
                     RETURN s.payload AS payload
                     ORDER BY s.updated_at DESC",
                )
                .param("user_id", user_id),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = cursor.next().await? {
            if let Some(payload) = row.get::<String>("payload") {
                records.push(serde_json::from_str(&payload)?);
            }
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<(), PipelineError> {
        self.graph.run(query("RETURN 1")).await.map_err(|e| {
            error!("Error en el health check de Neo4j: {}", e);
            PipelineError::from(e)
        })
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    /// Almacén en memoria para las pruebas.
    #[derive(Default)]
    pub struct InMemoryStore {
        records: RwLock<HashMap<(String, String), SummaryRecord>>,
    }

    impl InMemoryStore {
        pub async fn len(&self) -> usize {
            self.records.read().await.len()
        }
    }

    #[async_trait]
    impl SummaryStore for InMemoryStore {
        async fn save(&self, record: &SummaryRecord) -> Result<(), PipelineError> {
            self.records.write().await.insert(
                (record.user_id.clone(), record.document_id.clone()),
                record.clone(),
            );
            Ok(())
        }

        async fn load(
            &self,
            user_id: &str,
            document_id: &str,
        ) -> Result<SummaryRecord, PipelineError> {
            self.records
                .read()
                .await
                .get(&(user_id.to_string(), document_id.to_string()))
                .cloned()
                .ok_or(PipelineError::NotFound)
        }

        async fn list(&self, user_id: &str) -> Result<Vec<SummaryRecord>, PipelineError> {
            let mut records: Vec<SummaryRecord> = self
                .records
                .read()
                .await
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(records)
        }

        async fn ping(&self) -> Result<(), PipelineError> {
            Ok(())
        }
    }
}
