//! Neo4j connection, schema and full-text index management

use neo4rs::{query, Graph};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::models::GraphStats;
use super::relation_type::is_identifier;
use crate::config::Neo4jSettings;
use crate::error::{Error, Result};

/// Extra time granted on top of `db.awaitIndexes` before the client gives up
const AWAIT_GRACE: Duration = Duration::from_secs(2);

/// Whether a `db.awaitIndexes` failure means the wait ran out.
///
/// Neo4j reports this as "Timed out waiting for ..." or with a timeout status
/// code depending on the server version.
fn is_await_timeout(message: &str) -> bool {
    let message = message.to_lowercase();
    ["timed out", "timeout", "time out"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Graph store backed by Neo4j
#[derive(Clone)]
pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    /// Connect to Neo4j and verify the server answers within `timeout`
    pub async fn connect(settings: &Neo4jSettings, timeout: Duration) -> Result<Self> {
        let connect = async {
            let graph = Graph::new(
                settings.uri.as_str(),
                settings.user.as_str(),
                settings.password.as_str(),
            )
            .await?;
            let store = Self { graph };
            store.verify_connectivity().await?;
            Ok::<_, Error>(store)
        };

        let store = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| {
                Error::ConnectionError(format!(
                    "Neo4j at {} did not respond within {}s",
                    settings.uri,
                    timeout.as_secs()
                ))
            })??;

        info!("Connected to Neo4j at {}", settings.uri);
        Ok(store)
    }

    /// Wrap an existing driver handle
    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    async fn verify_connectivity(&self) -> Result<()> {
        let mut result = self.graph.execute(query("RETURN 1 AS ok")).await?;
        match result.next().await? {
            Some(row) if row.get::<i64>("ok")? == 1 => Ok(()),
            _ => Err(Error::ConnectionError("connectivity probe returned no row".into())),
        }
    }

    /// Uniqueness constraints on the node keys used by MERGE
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing Neo4j schema...");

        let constraints = [
            "CREATE CONSTRAINT document_id IF NOT EXISTS FOR (d:Document) REQUIRE d.doc_id IS UNIQUE",
            "CREATE CONSTRAINT paragraph_id IF NOT EXISTS FOR (p:Paragraph) REQUIRE p.paragraph_id IS UNIQUE",
            "CREATE CONSTRAINT sentence_id IF NOT EXISTS FOR (s:Sentence) REQUIRE s.sentence_id IS UNIQUE",
            "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (e:Entity) REQUIRE e.entity_id IS UNIQUE",
        ];

        for constraint in constraints {
            self.graph.run(query(constraint)).await?;
        }

        info!("Schema initialized successfully");
        Ok(())
    }

    pub async fn fulltext_index_exists(&self, index: &str) -> Result<bool> {
        let q = query(
            "SHOW FULLTEXT INDEXES YIELD name
             WHERE name = $name
             RETURN count(*) AS count",
        )
        .param("name", index);

        let mut result = self.graph.execute(q).await?;
        let count = match result.next().await? {
            Some(row) => row.get::<i64>("count")?,
            None => 0,
        };
        Ok(count > 0)
    }

    /// Create the Entity name full-text index if missing and wait until it is online.
    ///
    /// Exceeding `timeout` is reported as [`Error::IndexTimeout`]; callers treat it
    /// as fatal because search cannot run against a building index.
    pub async fn ensure_fulltext_index(&self, index: &str, timeout: Duration) -> Result<()> {
        if !is_identifier(index) {
            return Err(Error::InvalidArgument(format!(
                "invalid full-text index name: {:?}",
                index
            )));
        }

        if self.fulltext_index_exists(index).await? {
            debug!("Full-text index '{}' already exists", index);
        } else {
            info!("Creating full-text index '{}'", index);
            let statement = format!(
                "CREATE FULLTEXT INDEX {} IF NOT EXISTS FOR (n:Entity) ON EACH [n.name]",
                index
            );
            self.graph.run(query(&statement)).await?;
        }

        let await_indexes = self.graph.run(
            query("CALL db.awaitIndexes($timeout)").param("timeout", timeout.as_secs() as i64),
        );

        let timed_out = || Error::IndexTimeout {
            index: index.to_string(),
            seconds: timeout.as_secs(),
        };

        match tokio::time::timeout(timeout + AWAIT_GRACE, await_indexes).await {
            Err(_) => Err(timed_out()),
            Ok(Err(err)) if is_await_timeout(&err.to_string()) => {
                warn!("Waiting for full-text index '{}' timed out: {}", index, err);
                Err(timed_out())
            }
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(())) => {
                info!("Full-text index '{}' is online", index);
                Ok(())
            }
        }
    }

    /// Get graph statistics
    pub async fn stats(&self) -> Result<GraphStats> {
        let counts = query(
            "MATCH (d:Document) WITH count(d) AS documents
             MATCH (p:Paragraph) WITH documents, count(p) AS paragraphs
             MATCH (s:Sentence) WITH documents, paragraphs, count(s) AS sentences
             MATCH (e:Entity) WITH documents, paragraphs, sentences, count(e) AS entities
             OPTIONAL MATCH (:Entity)-[r]->(:Entity)
             RETURN documents, paragraphs, sentences, entities, count(r) AS relations",
        );

        let mut result = self.graph.execute(counts).await?;

        if let Some(row) = result.next().await? {
            return Ok(GraphStats {
                document_count: row.get::<i64>("documents")? as u64,
                paragraph_count: row.get::<i64>("paragraphs")? as u64,
                sentence_count: row.get::<i64>("sentences")? as u64,
                entity_count: row.get::<i64>("entities")? as u64,
                relation_count: row.get::<i64>("relations")? as u64,
            });
        }

        Ok(GraphStats::default())
    }
}
