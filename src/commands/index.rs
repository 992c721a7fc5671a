//! Index a local text file into a user's knowledge base

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::KnowledgeBase;
use crate::config::Config;

pub async fn run(config: &Config, path: &Path, user: &str) -> Result<usize> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let source = source_name(path);

    let stored = KnowledgeBase::connect(config)?
        .indexer(config)
        .index_text(user, &source, &text)
        .await
        .with_context(|| format!("failed to index {}", path.display()))?;

    info!("Stored {} chunks from {}", stored, source);
    println!("Indexed {} chunks from {} for {}", stored, source, user);
    Ok(stored)
}

/// File name used as the chunk `source` payload
fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_is_file_name() {
        assert_eq!(source_name(Path::new("/data/uploads/guide.txt")), "guide.txt");
        assert_eq!(source_name(Path::new("notes.md")), "notes.md");
    }

    #[tokio::test]
    async fn unreadable_file_is_reported() {
        let config = Config::new();
        let err = run(&config, Path::new("/nonexistent/guide.txt"), "a@example.com")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
