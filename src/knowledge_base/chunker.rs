//! Splits uploaded documents into overlapping chunks for embedding

use serde::Deserialize;

/// Text chunk produced by the chunker.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk within its document
    pub index: usize,
    pub text: String,
    /// Unit index of the first token or character
    pub start: usize,
    /// Unit index after the last token or character
    pub end: usize,
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Split by whitespace-separated words with overlap (default)
    #[default]
    Words,
    /// Split by characters; for scripts written without spaces such as Chinese
    Chars,
}

/// Windowed chunker with overlap.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    strategy: ChunkingStrategy,
}

impl Chunker {
    /// Create a new word chunker.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self::with_strategy(size, overlap, ChunkingStrategy::Words)
    }

    /// Create with custom strategy.
    pub fn with_strategy(size: usize, overlap: usize, strategy: ChunkingStrategy) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
            strategy,
        }
    }

    /// Split text into overlapping chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        match self.strategy {
            ChunkingStrategy::Words => {
                let words: Vec<&str> = text.split_whitespace().collect();
                self.windows(words.len(), |from, to| words[from..to].join(" "))
            }
            ChunkingStrategy::Chars => {
                let chars: Vec<char> = text.trim().chars().collect();
                self.windows(chars.len(), |from, to| {
                    chars[from..to].iter().collect::<String>().trim().to_string()
                })
            }
        }
    }

    fn windows(&self, len: usize, slice: impl Fn(usize, usize) -> String) -> Vec<Chunk> {
        let step = self.size.saturating_sub(self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut idx = 0;

        while idx < len {
            let end = (idx + self.size).min(len);
            let text = slice(idx, end);
            if !text.is_empty() {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text,
                    start: idx,
                    end,
                });
            }

            if end == len {
                break;
            }
            idx += step;
        }

        chunks
    }
}
