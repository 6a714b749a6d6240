use serde::{Deserialize, Serialize};

/// Richer memory record carrying an embedding vector, importance score, and
/// TTL, alongside the lighter per-user `UserPreference` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: i64,
    pub user_id: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    pub importance: f32,
    pub access_count: u32,
    pub ttl_days: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MemoryEntry {
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now - self.updated_at > chrono::Duration::days(self.ttl_days)
    }
}

/// A scored retrieval hit returned by `Memory::search_relevant`.
#[derive(Debug, Clone)]
pub struct RelevanceHit {
    pub entry: MemoryEntry,
    pub relevance: f32,
}

/// Ranks memory entries against a query. When no provider is configured,
/// retrieval falls back to keyword-overlap ranking.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// No embedding backend configured; `search_relevant` always takes the
/// keyword-overlap path.
pub struct NoEmbeddingProvider;

impl EmbeddingProvider for NoEmbeddingProvider {
    fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub fn keyword_overlap(query: &str, text: &str) -> f32 {
    let query_words: std::collections::HashSet<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words: std::collections::HashSet<&str> = text.split_whitespace().collect();
    let overlap = query_words.intersection(&text_words).count();
    overlap as f32 / query_words.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn keyword_overlap_counts_shared_words() {
        let score = keyword_overlap("fix the login bug", "the login page has a bug in it");
        assert!(score > 0.0);
    }
}
