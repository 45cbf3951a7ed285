use serde::{Deserialize, Serialize};

/// Similarity metric used to rank index candidates.
///
/// Scores are normalized to `[0, 1]` regardless of metric so that session
/// ordering and thresholds stay comparable across index backends.
///
/// `InnerProduct` assumes unit-normalized embeddings, which CLIP-style
/// encoders produce; the dot product of two unit vectors lies in `[-1, 1]`
/// and shifts into `[0, 1]` the same way cosine does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Cosine,
    InnerProduct,
}

impl SimilarityMetric {
    /// Score two raw vectors into the normalized `[0, 1]` domain.
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let score = match self {
            Self::Cosine => {
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                // cos in [-1, 1], shifted into [0, 1].
                (1.0 + dot / (norm_a * norm_b)) / 2.0
            }
            Self::InnerProduct => (1.0 + dot) / 2.0,
        };
        score.clamp(0.0, 1.0)
    }
}
