//! Integration tests for the diabetes_kg library
//!
//! Offline tests exercise the public API. Tests marked `#[ignore]` need a
//! running Neo4j (NEO4J_URI, NEO4J_USER, NEO4J_PASSWORD) and run with
//! `cargo test -- --ignored`.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::query;
use tempfile::{tempdir, NamedTempFile};
use tokio_util::sync::CancellationToken;

use diabetes_kg::{
    config::{Config, DEFAULT_SEARCH_LIMIT, FULLTEXT_INDEX_NAME},
    error::{Error, Result},
    knowledge_base::{Chunker, ChunkingStrategy, VectorSearchHit},
    knowledge_graph::{
        fulltext::{build_disjunction, escape_term},
        ingest::{corpus_files, plan, WriteStep},
        Document, EntityRef, GraphSearchHit, GraphStore, Ingestor, KnowledgeGraphSearch,
        RelatedEntity, RelationType,
    },
    retrieval::{ChunkSearcher, GraphSearcher, HybridRetriever},
};

const METFORMIN_DOC: &str = r#"{
    "doc_id": "D1",
    "paragraphs": [{
        "paragraph_id": "D1_P1",
        "paragraph": "Metformin may cause hypoglycemia.",
        "sentences": [{
            "sentence_id": "D1_P1_S1",
            "sentence": "Metformin may cause hypoglycemia.",
            "start_idx": 0,
            "end_idx": 33,
            "entities": [
                {"entity_id": "E1", "entity": "metformin", "entity_type": "drug", "start_idx": 0, "end_idx": 9},
                {"entity_id": "E2", "entity": "hypoglycemia", "entity_type": "symptom", "start_idx": 20, "end_idx": 32}
            ],
            "relations": [
                {"relation_type": "CAUSES", "relation_id": "R1", "head_entity_id": "E1", "tail_entity_id": "E2"}
            ]
        }]
    }]
}"#;

// ============================================================================
// Corpus Tests
// ============================================================================

#[test]
fn test_corpus_files_only_json_sorted() {
    let dir = tempdir().unwrap();
    for name in ["b.json", "a.json", "notes.txt"] {
        std::fs::write(dir.path().join(name), METFORMIN_DOC).unwrap();
    }
    std::fs::create_dir(dir.path().join("nested.json")).unwrap();

    let files = corpus_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["a.json", "b.json"]);
}

#[test]
fn test_corpus_files_missing_dir() {
    let err = corpus_files(std::path::Path::new("/nonexistent/diakg")).unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn test_document_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(METFORMIN_DOC.as_bytes()).unwrap();

    let doc = Document::from_path(file.path()).unwrap();
    assert_eq!(doc.doc_id, "D1");
    assert_eq!(doc.entity_count(), 2);
}

#[test]
fn test_plan_writes_nodes_before_edges() {
    let doc: Document = serde_json::from_str(METFORMIN_DOC).unwrap();
    let steps = plan(&doc).unwrap();

    assert_eq!(steps.len(), 6);
    assert!(matches!(steps[0], WriteStep::Document { doc_id: "D1" }));
    assert!(matches!(
        steps.last(),
        Some(WriteStep::Relation {
            relation_type: RelationType::Causes,
            ..
        })
    ));
    assert!(steps.last().unwrap().cypher().contains("[r:CAUSES]"));
}

#[test]
fn test_plan_rejects_unknown_relation_type() {
    let doc: Document =
        serde_json::from_str(&METFORMIN_DOC.replace("\"CAUSES\"", "\"CAUSES]->() DETACH DELETE (n\""))
            .unwrap();
    let err = plan(&doc).unwrap_err();
    assert!(matches!(err, Error::InvalidRelationType(_)));
}

// ============================================================================
// Full-text Query Tests
// ============================================================================

#[test]
fn test_disjunction_escapes_each_term() {
    assert_eq!(
        build_disjunction("HbA1c (glycated) 7%").unwrap(),
        r"HbA1c OR \(glycated\) OR 7%"
    );
    assert_eq!(escape_term("a/b"), r"a\/b");
}

#[test]
fn test_disjunction_blank_query() {
    assert!(matches!(
        build_disjunction(" \t "),
        Err(Error::NoValidQueryTerms(_))
    ));
}

// ============================================================================
// Chunker / Config Tests
// ============================================================================

#[test]
fn test_chunker_public_api() {
    let chunker = Chunker::with_strategy(5, 0, ChunkingStrategy::Chars);
    let chunks = chunker.chunk("糖尿病患者应监测血糖");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "糖尿病患者");
}

#[test]
fn test_config_defaults() {
    let config = Config::new();
    assert!(config.search.default_limit > 0);
    assert!(!config.search.fulltext_index.is_empty());
    assert_eq!(DEFAULT_SEARCH_LIMIT, 20);
    assert_eq!(FULLTEXT_INDEX_NAME, "fulltext_index_entity_name");
}

// ============================================================================
// Hybrid Retrieval Tests
// ============================================================================

struct StaticGraph;

#[async_trait]
impl GraphSearcher for StaticGraph {
    async fn search_graph(&self, _query: &str, limit: usize) -> Result<Vec<GraphSearchHit>> {
        Ok((0..limit)
            .map(|i| GraphSearchHit {
                node: EntityRef {
                    name: Some(format!("entity-{}", i)),
                    entity_type: Some("Drug".into()),
                },
                relationships: vec![RelatedEntity {
                    relation_type: "TREATS".into(),
                    related: EntityRef::default(),
                }],
                score: 1.0 / (i as f32 + 1.0),
            })
            .collect())
    }
}

struct BrokenChunks;

#[async_trait]
impl ChunkSearcher for BrokenChunks {
    async fn search_chunks(
        &self,
        _query: &str,
        _limit: usize,
        _identity: Option<&str>,
    ) -> Result<Vec<VectorSearchHit>> {
        Err(Error::VectorStoreError("collection knowledge_doc not found".into()))
    }
}

#[tokio::test]
async fn test_hybrid_degrades_and_respects_limit() {
    let retriever = HybridRetriever::new(Arc::new(StaticGraph), Arc::new(BrokenChunks));

    let result = retriever
        .search("metformin", 8, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.graph_hits.len(), 4);
    assert!(result.vector_hits.is_empty());
    assert!(result.graph_hits.len() + result.vector_hits.len() <= 8);
}

#[test]
fn test_hybrid_from_blocking_caller() {
    let retriever = HybridRetriever::new(Arc::new(StaticGraph), Arc::new(BrokenChunks));
    let cancel = CancellationToken::new();

    let result = tokio_test::block_on(retriever.search("insulin", -5, None, &cancel));
    let result = tokio_test::assert_ok!(result);

    assert_eq!(result.graph_hits.len(), (DEFAULT_SEARCH_LIMIT / 2) as usize);
}

// ============================================================================
// Live Neo4j Tests
// ============================================================================

async fn live_store() -> GraphStore {
    let config = Config::new();
    let store = GraphStore::connect(&config.neo4j, Duration::from_secs(10))
        .await
        .expect("Neo4j must be running for ignored tests");
    store.init_schema().await.unwrap();
    store
}

fn live_ingestor(store: &GraphStore) -> Ingestor {
    Ingestor::new(store.clone(), FULLTEXT_INDEX_NAME, Duration::from_secs(10))
}

async fn count(store: &GraphStore, cypher: &str, id: &str) -> i64 {
    let mut rows = store
        .graph()
        .execute(query(cypher).param("id", id))
        .await
        .unwrap();
    let row = rows.next().await.unwrap().expect("count returns one row");
    row.get::<i64>("n").unwrap()
}

#[tokio::test]
#[ignore] // Requires a running Neo4j
async fn test_live_ingest_is_idempotent() {
    let store = live_store().await;
    let ingestor = live_ingestor(&store);
    let doc: Document = serde_json::from_str(METFORMIN_DOC).unwrap();

    ingestor.ingest(&doc).await.unwrap();
    let first = store.stats().await.unwrap();
    ingestor.ingest(&doc).await.unwrap();
    let second = store.stats().await.unwrap();

    assert!(first.document_count >= 1);
    assert!(first.sentence_count >= 1);
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore] // Requires a running Neo4j
async fn test_live_sentence_reached_through_containment() {
    let store = live_store().await;
    let doc: Document = serde_json::from_str(METFORMIN_DOC).unwrap();
    live_ingestor(&store).ingest(&doc).await.unwrap();

    let mut rows = store
        .graph()
        .execute(
            query(
                "MATCH (:Document {doc_id: $doc_id})-[:CONTAINS_PARAGRAPH]->(p:Paragraph)
                       -[:CONTAINS_SENTENCE]->(s:Sentence {sentence_id: $sentence_id})
                 RETURN p.text AS paragraph, s.text AS text, s.start_idx AS start_idx, s.end_idx AS end_idx",
            )
            .param("doc_id", "D1")
            .param("sentence_id", "D1_P1_S1"),
        )
        .await
        .unwrap();

    let row = rows.next().await.unwrap().expect("sentence is reachable from its document");
    let sentence = &doc.paragraphs[0].sentences[0];
    assert_eq!(row.get::<String>("paragraph").unwrap(), doc.paragraphs[0].text);
    assert_eq!(row.get::<String>("text").unwrap(), sentence.text);
    assert_eq!(row.get::<i64>("start_idx").unwrap(), sentence.start_idx);
    assert_eq!(row.get::<i64>("end_idx").unwrap(), sentence.end_idx);
    assert!(rows.next().await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires a running Neo4j
async fn test_live_metformin_search() {
    let store = live_store().await;
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("D1.json"), METFORMIN_DOC).unwrap();

    let report = live_ingestor(&store)
        .ingest_corpus(dir.path(), true)
        .await
        .unwrap();
    assert_eq!(report.documents_ingested, 1);

    let hits = KnowledgeGraphSearch::new(store, FULLTEXT_INDEX_NAME)
        .search_graph("metformin", 10)
        .await
        .unwrap();

    let hit = hits
        .iter()
        .find(|h| h.node.name.as_deref() == Some("metformin"))
        .expect("metformin entity should be found");
    assert_eq!(hit.node.entity_type.as_deref(), Some("drug"));
    assert!(hit.relationships.iter().any(|r| r.relation_type == "CAUSES"
        && r.related.name.as_deref() == Some("hypoglycemia")
        && r.related.entity_type.as_deref() == Some("symptom")));
}

#[tokio::test]
#[ignore] // Requires a running Neo4j
async fn test_live_missing_endpoint_rolls_back() {
    let store = live_store().await;
    let mut doc: Document = serde_json::from_str(METFORMIN_DOC).unwrap();
    doc.doc_id = "D_BROKEN".into();
    let paragraph = &mut doc.paragraphs[0];
    paragraph.paragraph_id = "DB_P1".into();
    let sentence = &mut paragraph.sentences[0];
    sentence.sentence_id = "DB_P1_S1".into();
    sentence.entities[0].entity_id = "DB_E1".into();
    sentence.entities[1].entity_id = "DB_E2".into();
    sentence.relations[0].relation_id = "DB_R1".into();
    sentence.relations[0].head_entity_id = "DB_E1".into();
    sentence.relations[0].tail_entity_id = "DB_E404".into();

    let err = live_ingestor(&store).ingest(&doc).await.unwrap_err();
    assert!(matches!(err, Error::MissingRelationEndpoint { .. }));

    // Nothing of the document survives the rollback
    assert_eq!(
        count(&store, "MATCH (d:Document {doc_id: $id}) RETURN count(d) AS n", "D_BROKEN").await,
        0
    );
    assert_eq!(
        count(&store, "MATCH (p:Paragraph {paragraph_id: $id}) RETURN count(p) AS n", "DB_P1").await,
        0
    );
    assert_eq!(
        count(
            &store,
            "MATCH (e:Entity) WHERE e.entity_id STARTS WITH $id RETURN count(e) AS n",
            "DB_"
        )
        .await,
        0
    );
}
