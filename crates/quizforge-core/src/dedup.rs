//! Duplicate and near-duplicate question rejection.
//!
//! Questions are compared by canonical key. An exact key match always
//! rejects; below a threshold of 1.0, trigram Jaccard similarity against
//! every previously accepted key rejects near-duplicates as well. Acceptance
//! is greedy: the first-seen question wins.

use std::collections::HashSet;

use crate::model::Question;

/// Similarity at or above which two questions count as duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.78;

/// Normalize question text for duplicate comparison.
///
/// Lowercases, strips a leading numbering prefix (`1.`, `2)`, `(3)`,
/// `Q4:`, `Question 5 -`), drops apostrophes, turns other punctuation into
/// spaces, and collapses whitespace. The result contains only alphanumerics
/// and single spaces, so the function is idempotent.
pub fn canonicalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let body = strip_numbering(&lowered);

    let mut key = String::with_capacity(body.len());
    let mut pending_space = false;
    for c in body.chars() {
        if c == '\'' || c == '\u{2019}' {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_space && !key.is_empty() {
                key.push(' ');
            }
            pending_space = false;
            key.push(c);
        } else {
            pending_space = true;
        }
    }
    key
}

/// Remove one leading numbering label. Requires a terminator (`.`, `)`, `:`,
/// `-`) or an enclosing `(...)` so that plain leading numbers such as
/// "1984 was..." survive.
fn strip_numbering(s: &str) -> &str {
    let mut rest = s;
    for prefix in ["question", "q"] {
        if let Some(r) = rest.strip_prefix(prefix) {
            let r = r.trim_start();
            if r.starts_with(|c: char| c.is_ascii_digit()) {
                rest = r;
                break;
            }
        }
    }

    let parenthesized = rest.starts_with('(');
    let inner = rest.trim_start_matches('(');
    let digits = inner.len() - inner.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return s;
    }

    let after = inner[digits..].trim_start();
    let stripped = match after.chars().next() {
        Some(')') => &after[1..],
        Some('.' | ':' | '-') if !parenthesized => &after[1..],
        _ => return s,
    };
    stripped.trim_start()
}

/// Overlapping 3-character shingles of a key. Keys shorter than three
/// characters yield themselves as the only shingle.
fn trigrams(key: &str) -> HashSet<String> {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 3 {
        return if chars.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([key.to_string()])
        };
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Jaccard similarity of the trigram sets of two canonical keys.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    similarity_of_sets(&trigrams(a), &trigrams(b))
}

fn similarity_of_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Accumulates accepted keys across generation calls within one session.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
    seen_keys: Vec<String>,
    seen_set: HashSet<String>,
    seen_trigrams: Vec<HashSet<String>>,
}

impl Deduplicator {
    /// Create an empty deduplicator. A threshold of 1.0 or above means exact
    /// key matching only.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            seen_keys: Vec::new(),
            seen_set: HashSet::new(),
            seen_trigrams: Vec::new(),
        }
    }

    /// Resume from keys accepted earlier.
    pub fn with_seen_keys(threshold: f64, keys: impl IntoIterator<Item = String>) -> Self {
        let mut dedup = Self::new(threshold);
        for key in keys {
            dedup.remember(key);
        }
        dedup
    }

    fn exact_only(&self) -> bool {
        self.threshold >= 1.0
    }

    fn remember(&mut self, key: String) {
        if self.seen_set.insert(key.clone()) {
            if !self.exact_only() {
                self.seen_trigrams.push(trigrams(&key));
            }
            self.seen_keys.push(key);
        }
    }

    /// Whether text would be rejected, without recording it.
    pub fn is_duplicate(&self, text: &str) -> bool {
        let key = canonicalize(text);
        self.is_duplicate_key(&key)
    }

    fn is_duplicate_key(&self, key: &str) -> bool {
        if self.seen_set.contains(key) {
            return true;
        }
        if self.exact_only() {
            return false;
        }
        let candidate = trigrams(key);
        self.seen_trigrams
            .iter()
            .any(|seen| similarity_of_sets(&candidate, seen) >= self.threshold)
    }

    /// Accept a question if it is not a duplicate of anything seen so far.
    pub fn accept(&mut self, question: &Question) -> bool {
        let key = canonicalize(&question.text);
        if self.is_duplicate_key(&key) {
            tracing::debug!(question = %question.text, "rejected duplicate question");
            return false;
        }
        self.remember(key);
        true
    }

    /// Keep the candidates that are not duplicates of earlier accepted
    /// questions or of each other, in input order.
    pub fn accumulate_unique(&mut self, candidates: Vec<Question>) -> Vec<Question> {
        candidates.into_iter().filter(|q| self.accept(q)).collect()
    }

    /// Keys accepted so far, in acceptance order.
    pub fn seen_keys(&self) -> &[String] {
        &self.seen_keys
    }

    pub fn len(&self) -> usize {
        self.seen_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_keys.is_empty()
    }
}

/// Functional form: filter `candidates` against `seen_keys` and return the
/// accepted questions together with the extended key list.
pub fn accumulate_unique(
    candidates: Vec<Question>,
    seen_keys: Vec<String>,
    threshold: f64,
) -> (Vec<Question>, Vec<String>) {
    let mut dedup = Deduplicator::with_seen_keys(threshold, seen_keys);
    let accepted = dedup.accumulate_unique(candidates);
    (accepted, dedup.seen_keys)
}
