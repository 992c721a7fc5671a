//! Lucene query construction for the entity full-text index

use crate::error::{Error, Result};

use super::models::GraphSearchHit;

/// Characters with operator meaning in the Lucene classic query parser
pub const RESERVED_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Backslash-escape every reserved character so the term matches literally
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() * 2);
    for ch in term.chars() {
        if RESERVED_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Uppercase keyword operators of the Lucene classic query parser
const KEYWORD_OPERATORS: &[&str] = &["AND", "OR", "NOT"];

/// Lowercase a bare keyword operator so the parser reads it as a term
fn neutralize_keyword(term: &str) -> String {
    if KEYWORD_OPERATORS.contains(&term) {
        term.to_lowercase()
    } else {
        escape_term(term)
    }
}

/// Split on whitespace and escape each term
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(neutralize_keyword)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Build the `term OR term ...` disjunction passed to `queryNodes`
pub fn build_disjunction(query: &str) -> Result<String> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Err(Error::NoValidQueryTerms(query.to_string()));
    }
    Ok(terms.join(" OR "))
}

/// Keep entities that have relationships, best score first, at most `limit`.
pub fn rank_hits(mut hits: Vec<GraphSearchHit>, limit: usize) -> Vec<GraphSearchHit> {
    hits.retain(|h| !h.relationships.is_empty());
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_graph::models::{EntityRef, RelatedEntity};

    fn hit(name: &str, score: f32, relations: usize) -> GraphSearchHit {
        GraphSearchHit {
            node: EntityRef {
                name: Some(name.into()),
                entity_type: Some("Drug".into()),
            },
            relationships: (0..relations)
                .map(|i| RelatedEntity {
                    relation_type: "Drug_Disease".into(),
                    related: EntityRef {
                        name: Some(format!("related-{}", i)),
                        entity_type: Some("Disease".into()),
                    },
                })
                .collect(),
            score,
        }
    }

    /// Undo escaping the way the Lucene parser reads a term
    fn unescape(term: &str) -> String {
        let mut out = String::new();
        let mut chars = term.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    #[test]
    fn escapes_every_reserved_character() {
        for &ch in RESERVED_CHARS {
            let term = format!("a{}b", ch);
            let escaped = escape_term(&term);
            assert_eq!(escaped, format!("a\\{}b", ch), "char {:?}", ch);
            assert_eq!(unescape(&escaped), term);
        }
    }

    #[test]
    fn escaped_term_has_no_bare_operators() {
        let term = r#"(metformin)&&"insulin"~2^3:a/b\c*?"#;
        let escaped = escape_term(term);

        let mut chars = escaped.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                let next = chars.next().expect("escape is followed by a character");
                assert!(RESERVED_CHARS.contains(&next));
            } else {
                assert!(!RESERVED_CHARS.contains(&ch), "bare {:?} in {}", ch, escaped);
            }
        }
        assert_eq!(unescape(&escaped), term);
    }

    #[test]
    fn plain_terms_pass_through() {
        assert_eq!(escape_term("metformin"), "metformin");
        assert_eq!(escape_term("二甲双胍"), "二甲双胍");
    }

    #[test]
    fn builds_or_disjunction() {
        assert_eq!(
            build_disjunction("metformin  type-2\tdiabetes").unwrap(),
            "metformin OR type\\-2 OR diabetes"
        );
    }

    #[test]
    fn whitespace_only_query_has_no_terms() {
        let err = build_disjunction(" \t\n ").unwrap_err();
        assert!(matches!(err, Error::NoValidQueryTerms(_)));
        assert!(build_disjunction("").is_err());
    }

    #[test]
    fn keyword_operators_become_plain_terms() {
        assert_eq!(build_disjunction("insulin AND").unwrap(), "insulin OR and");
        assert_eq!(build_disjunction("NOT metformin").unwrap(), "not OR metformin");
        assert_eq!(build_disjunction("a OR b").unwrap(), "a OR or OR b");

        let query = build_disjunction("AND OR NOT").unwrap();
        let terms: Vec<&str> = query.split(" OR ").collect();
        assert!(terms.iter().all(|t| !KEYWORD_OPERATORS.contains(t)));
    }

    #[test]
    fn mixed_case_operator_words_are_ordinary_terms() {
        assert_eq!(build_disjunction("And or Not").unwrap(), "And OR or OR Not");
    }

    #[test]
    fn rank_hits_drops_isolated_entities() {
        let ranked = rank_hits(vec![hit("lonely", 9.0, 0), hit("metformin", 1.0, 1)], 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].node.name.as_deref(), Some("metformin"));
    }

    #[test]
    fn rank_hits_orders_by_score_and_truncates() {
        let ranked = rank_hits(
            vec![
                hit("a", 0.5, 1),
                hit("b", 2.5, 2),
                hit("c", 1.5, 1),
                hit("d", 3.0, 1),
            ],
            3,
        );

        let scores: Vec<f32> = ranked.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![3.0, 2.5, 1.5]);
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn rank_hits_zero_limit_is_empty() {
        assert!(rank_hits(vec![hit("a", 1.0, 1)], 0).is_empty());
    }
}
