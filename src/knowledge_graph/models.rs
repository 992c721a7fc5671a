//! Corpus records and search result shapes

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// One annotated document, as stored in a corpus JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub doc_id: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    pub paragraph_id: String,
    /// Paragraph body
    #[serde(rename = "paragraph", default)]
    pub text: String,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentence {
    pub sentence_id: String,
    /// Sentence body
    #[serde(rename = "sentence", default)]
    pub text: String,
    /// Character offset into the paragraph
    #[serde(default)]
    pub start_idx: i64,
    #[serde(default)]
    pub end_idx: i64,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub entity_id: String,
    /// Display name (surface form in the sentence)
    #[serde(rename = "entity", default)]
    pub name: String,
    /// Type tag such as `Drug` or `Disease`
    #[serde(rename = "entity_type", default)]
    pub entity_type: String,
    /// Character offset into the sentence
    #[serde(default)]
    pub start_idx: i64,
    #[serde(default)]
    pub end_idx: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    /// Raw label; validated before it becomes an edge type
    pub relation_type: String,
    pub relation_id: String,
    pub head_entity_id: String,
    pub tail_entity_id: String,
}

impl Document {
    /// Read and parse a single corpus file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let document: Document = serde_json::from_str(&content)?;
        Ok(document)
    }

    /// Reject documents with blank keys before any write is attempted
    pub fn validate(&self) -> Result<()> {
        if self.doc_id.trim().is_empty() {
            return Err(Error::InvalidDocument("missing doc_id".into()));
        }

        for paragraph in &self.paragraphs {
            require_id(&paragraph.paragraph_id, "paragraph_id", &self.doc_id)?;
            for sentence in &paragraph.sentences {
                require_id(&sentence.sentence_id, "sentence_id", &self.doc_id)?;
                for entity in &sentence.entities {
                    require_id(&entity.entity_id, "entity_id", &self.doc_id)?;
                }
                for relation in &sentence.relations {
                    require_id(&relation.relation_id, "relation_id", &self.doc_id)?;
                    require_id(&relation.head_entity_id, "head_entity_id", &self.doc_id)?;
                    require_id(&relation.tail_entity_id, "tail_entity_id", &self.doc_id)?;
                }
            }
        }

        Ok(())
    }

    pub fn sentences(&self) -> impl Iterator<Item = &Sentence> {
        self.paragraphs.iter().flat_map(|p| p.sentences.iter())
    }

    pub fn entity_count(&self) -> usize {
        self.sentences().map(|s| s.entities.len()).sum()
    }

    pub fn relation_count(&self) -> usize {
        self.sentences().map(|s| s.relations.len()).sum()
    }
}

fn require_id(value: &str, field: &str, doc_id: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidDocument(format!(
            "document {} has an empty {}",
            doc_id, field
        )));
    }
    Ok(())
}

/// Entity projection returned by graph search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
}

/// One edge of a matched entity's neighbourhood
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedEntity {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub related: EntityRef,
}

/// Matched entity with its relationships and full-text score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphSearchHit {
    pub node: EntityRef,
    pub relationships: Vec<RelatedEntity>,
    pub score: f32,
}

/// Node and edge counts
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub document_count: u64,
    pub paragraph_count: u64,
    pub sentence_count: u64,
    pub entity_count: u64,
    pub relation_count: u64,
}
