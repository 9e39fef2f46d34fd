//! Index-name extraction and pattern matching.
//!
//! # Responsibilities
//! - Extract the comma-separated index list from the URL path
//! - Union in the `index` fields of `_msearch` body header lines
//! - Match concrete index names against credential glob patterns
//!
//! # Design Decisions
//! - The empty set means "all indices" (cluster-wide request)
//! - `_all` and `*` collapse the whole set to empty
//! - `*` in a pattern matches any run of non-`/` characters

use std::collections::BTreeSet;

/// The set of index names a request touches. Empty means cluster-wide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet(BTreeSet<String>);

impl IndexSet {
    pub fn new() -> IndexSet {
        IndexSet(BTreeSet::new())
    }

    /// Extract indices from the first URL path segment. Endpoint segments
    /// (`_`-prefixed, other than `_all`) contribute nothing.
    pub fn from_path(path: &str) -> IndexSet {
        let mut set = IndexSet::new();
        let first = path.split('/').find(|s| !s.is_empty());

        if let Some(segment) = first {
            if segment.starts_with('_') && segment != "_all" {
                return set;
            }
            for token in segment.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                // The all-indices tokens collapse the set to empty.
                if token == "_all" || token == "*" {
                    return IndexSet::new();
                }
                set.0.insert(token.to_string());
            }
        }
        set
    }

    /// Union in the `index` fields from an `_msearch` body. Every other
    /// NDJSON line is a header object which may carry `"index"` as a string
    /// or an array of strings; unreadable lines are skipped.
    pub fn union_msearch_body(&mut self, body: &[u8]) {
        let Ok(text) = std::str::from_utf8(body) else {
            return;
        };
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                continue;
            };
            match value.get("index") {
                Some(serde_json::Value::String(name)) => {
                    self.insert(name);
                }
                Some(serde_json::Value::Array(names)) => {
                    for name in names.iter().filter_map(|v| v.as_str()) {
                        self.insert(name);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn insert(&mut self, index: &str) {
        if index != "_all" && index != "*" && !index.is_empty() {
            self.0.insert(index.to_string());
        }
    }

    /// True when the request addresses the whole cluster.
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Glob match of a credential index pattern against a concrete index name.
/// `*` matches any run of characters except `/`; everything else is literal.
pub fn pattern_matches(pattern: &str, index: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = index.chars().collect();

    // Two-pointer wildcard match with backtracking to the last star.
    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == n[ni]) && p[pi] != '*' {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((star_pi, star_ni)) = star {
            if n[star_ni] == '/' {
                return false;
            }
            star = Some((star_pi, star_ni + 1));
            pi = star_pi + 1;
            ni = star_ni + 1;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let set = IndexSet::from_path("/twitter/_search");
        assert_eq!(set.to_vec(), vec!["twitter"]);

        let set = IndexSet::from_path("/a,b,c/_msearch");
        assert_eq!(set.to_vec(), vec!["a", "b", "c"]);

        assert!(IndexSet::from_path("/_search").is_all());
        assert!(IndexSet::from_path("/_cluster/health").is_all());
        assert!(IndexSet::from_path("/").is_all());
    }

    #[test]
    fn test_all_tokens_collapse() {
        assert!(IndexSet::from_path("/_all/_search").is_all());
        assert!(IndexSet::from_path("/*/_search").is_all());
        assert!(IndexSet::from_path("/a,_all/_search").is_all());
    }

    #[test]
    fn test_msearch_body_union() {
        let mut set = IndexSet::from_path("/_msearch");
        let body = concat!(
            "{\"index\":\"a\"}\n",
            "{\"query\":{\"match_all\":{}}}\n",
            "{\"index\":[\"b\",\"c\"]}\n",
            "{\"query\":{\"match_all\":{}}}\n",
            "not json at all\n",
        );
        set.union_msearch_body(body.as_bytes());
        assert_eq!(set.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_glob_matching() {
        assert!(pattern_matches("logs-*", "logs-2024"));
        assert!(!pattern_matches("logs-*", "logslive"));
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("twitter", "twitter"));
        assert!(!pattern_matches("twitter", "twitter2"));
        assert!(pattern_matches("a*c", "abc"));
        assert!(pattern_matches("a*c", "ac"));
        assert!(!pattern_matches("a*c", "ab"));
        assert!(!pattern_matches("a*c", "a/c"));
    }
}
