//! Corpus ingestion: documents become Document → Paragraph → Sentence → Entity
//! chains with typed Entity → Entity relation edges.

use neo4rs::{query, Query, Txn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::models::{Document, Entity, Paragraph, Relation, Sentence};
use super::relation_type::RelationType;
use super::store::GraphStore;
use crate::error::{Error, Result};

/// One MERGE statement of a document's write plan
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStep<'a> {
    Document {
        doc_id: &'a str,
    },
    Paragraph {
        doc_id: &'a str,
        paragraph: &'a Paragraph,
    },
    Sentence {
        paragraph_id: &'a str,
        sentence: &'a Sentence,
    },
    Entity {
        sentence_id: &'a str,
        entity: &'a Entity,
    },
    Relation {
        relation_type: RelationType,
        relation: &'a Relation,
    },
}

impl WriteStep<'_> {
    pub fn cypher(&self) -> String {
        match self {
            WriteStep::Document { .. } => "MERGE (d:Document {doc_id: $doc_id})".to_string(),
            WriteStep::Paragraph { .. } => "MATCH (d:Document {doc_id: $doc_id})
                 MERGE (p:Paragraph {paragraph_id: $paragraph_id})
                 SET p.text = $text
                 MERGE (d)-[:CONTAINS_PARAGRAPH]->(p)"
                .to_string(),
            WriteStep::Sentence { .. } => "MATCH (p:Paragraph {paragraph_id: $paragraph_id})
                 MERGE (s:Sentence {sentence_id: $sentence_id})
                 SET s.text = $text, s.start_idx = $start_idx, s.end_idx = $end_idx
                 MERGE (p)-[:CONTAINS_SENTENCE]->(s)"
                .to_string(),
            WriteStep::Entity { .. } => "MATCH (s:Sentence {sentence_id: $sentence_id})
                 MERGE (e:Entity {entity_id: $entity_id})
                 SET e.name = $name, e.type = $type,
                     e.start_idx = $start_idx, e.end_idx = $end_idx
                 MERGE (s)-[:CONTAINS_ENTITY]->(e)"
                .to_string(),
            // The label is a parsed RelationType, never raw input
            WriteStep::Relation { relation_type, .. } => format!(
                "MATCH (h:Entity {{entity_id: $head_id}})
                 MATCH (t:Entity {{entity_id: $tail_id}})
                 MERGE (h)-[r:{}]->(t)
                 SET r.relation_id = $relation_id
                 RETURN count(r) AS linked",
                relation_type.as_str()
            ),
        }
    }

    pub fn to_query(&self) -> Query {
        let q = query(&self.cypher());
        match self {
            WriteStep::Document { doc_id } => q.param("doc_id", *doc_id),
            WriteStep::Paragraph { doc_id, paragraph } => q
                .param("doc_id", *doc_id)
                .param("paragraph_id", paragraph.paragraph_id.as_str())
                .param("text", paragraph.text.as_str()),
            WriteStep::Sentence {
                paragraph_id,
                sentence,
            } => q
                .param("paragraph_id", *paragraph_id)
                .param("sentence_id", sentence.sentence_id.as_str())
                .param("text", sentence.text.as_str())
                .param("start_idx", sentence.start_idx)
                .param("end_idx", sentence.end_idx),
            WriteStep::Entity {
                sentence_id,
                entity,
            } => q
                .param("sentence_id", *sentence_id)
                .param("entity_id", entity.entity_id.as_str())
                .param("name", entity.name.as_str())
                .param("type", entity.entity_type.as_str())
                .param("start_idx", entity.start_idx)
                .param("end_idx", entity.end_idx),
            WriteStep::Relation { relation, .. } => q
                .param("head_id", relation.head_entity_id.as_str())
                .param("tail_id", relation.tail_entity_id.as_str())
                .param("relation_id", relation.relation_id.as_str()),
        }
    }
}

/// Validate a document and order its writes.
///
/// All node writes come before any relation edge, so a relation may point at an
/// entity from a later sentence of the same document.
pub fn plan(document: &Document) -> Result<Vec<WriteStep<'_>>> {
    document.validate()?;

    let mut nodes = vec![WriteStep::Document {
        doc_id: &document.doc_id,
    }];
    let mut edges = Vec::new();

    for paragraph in &document.paragraphs {
        nodes.push(WriteStep::Paragraph {
            doc_id: &document.doc_id,
            paragraph,
        });

        for sentence in &paragraph.sentences {
            nodes.push(WriteStep::Sentence {
                paragraph_id: &paragraph.paragraph_id,
                sentence,
            });

            for entity in &sentence.entities {
                nodes.push(WriteStep::Entity {
                    sentence_id: &sentence.sentence_id,
                    entity,
                });
            }

            for relation in &sentence.relations {
                let relation_type = relation.relation_type.parse::<RelationType>().map_err(|e| {
                    warn!(
                        doc_id = %document.doc_id,
                        relation_id = %relation.relation_id,
                        relation_type = %relation.relation_type,
                        "Rejecting relation with unknown type, review required"
                    );
                    e
                })?;
                edges.push(WriteStep::Relation {
                    relation_type,
                    relation,
                });
            }
        }
    }

    nodes.extend(edges);
    Ok(nodes)
}

/// Counts written for one document
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub paragraphs: usize,
    pub sentences: usize,
    pub entities: usize,
    pub relations: usize,
}

impl IngestReport {
    fn record(&mut self, step: &WriteStep<'_>) {
        match step {
            WriteStep::Document { .. } => {}
            WriteStep::Paragraph { .. } => self.paragraphs += 1,
            WriteStep::Sentence { .. } => self.sentences += 1,
            WriteStep::Entity { .. } => self.entities += 1,
            WriteStep::Relation { .. } => self.relations += 1,
        }
    }

    fn add(&mut self, other: &IngestReport) {
        self.paragraphs += other.paragraphs;
        self.sentences += other.sentences;
        self.entities += other.entities;
        self.relations += other.relations;
    }
}

/// Outcome of loading a corpus directory
#[derive(Debug, Default, Clone, Serialize)]
pub struct CorpusReport {
    pub documents_ingested: usize,
    pub documents_failed: Vec<PathBuf>,
    pub totals: IngestReport,
}

/// Writes documents into the graph, one transaction per document
#[derive(Clone)]
pub struct Ingestor {
    store: GraphStore,
    index_name: String,
    index_timeout: Duration,
}

impl Ingestor {
    pub fn new(store: GraphStore, index_name: impl Into<String>, index_timeout: Duration) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            index_timeout,
        }
    }

    /// Merge a whole document atomically. Any failed step rolls everything back.
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let steps = plan(document)?;

        let mut txn = self.store.graph().start_txn().await?;
        match Self::apply(&mut txn, &steps).await {
            Ok(report) => {
                txn.commit().await?;
                debug!(
                    "Ingested document {}: {} sentences, {} entities, {} relations",
                    document.doc_id, report.sentences, report.entities, report.relations
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(
                        "Rollback of document {} failed: {}",
                        document.doc_id, rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn apply(txn: &mut Txn, steps: &[WriteStep<'_>]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for step in steps {
            match step {
                WriteStep::Relation { relation, .. } => {
                    let mut stream = txn.execute(step.to_query()).await?;
                    let mut linked = 0;
                    while let Some(row) = stream.next(txn.handle()).await? {
                        linked = row.get::<i64>("linked")?;
                    }
                    if linked == 0 {
                        return Err(Error::MissingRelationEndpoint {
                            relation_id: relation.relation_id.clone(),
                            head: relation.head_entity_id.clone(),
                            tail: relation.tail_entity_id.clone(),
                        });
                    }
                }
                _ => txn.run(step.to_query()).await?,
            }
            report.record(step);
        }

        Ok(report)
    }

    /// Ingest every `*.json` document in `dir`, then make sure the full-text index is online.
    ///
    /// A bad file is logged and skipped; an index that does not come online is fatal.
    pub async fn ingest_corpus(&self, dir: &Path, ensure_index: bool) -> Result<CorpusReport> {
        let files = corpus_files(dir)?;
        info!("Found {} corpus files in {}", files.len(), dir.display());

        let mut report = CorpusReport::default();

        for file in files {
            let outcome = match Document::from_path(&file) {
                Ok(document) => self.ingest(&document).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(doc_report) => {
                    report.documents_ingested += 1;
                    report.totals.add(&doc_report);
                    info!("Saved {}", file.display());
                }
                Err(err) => {
                    error!("Failed to ingest {}: {}", file.display(), err);
                    report.documents_failed.push(file);
                }
            }
        }

        if ensure_index {
            self.store
                .ensure_fulltext_index(&self.index_name, self.index_timeout)
                .await?;
        }

        Ok(report)
    }
}

/// JSON files directly inside `dir`, sorted by file name
pub fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "corpus directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    files.sort();
    Ok(files)
}
