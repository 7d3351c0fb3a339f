/// Cosine similarity between two vectors.
///
/// Vectors of different length, or with zero magnitude, score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        0.0
    } else {
        dot_product / (magnitude_a * magnitude_b)
    }
}

/// In-place exponential moving average: `c = alpha * incoming + (1 - alpha) * c`.
pub fn ema_update(centroid: &mut [f32], incoming: &[f32], alpha: f32) {
    for (current, new) in centroid.iter_mut().zip(incoming.iter()) {
        *current = alpha * new + (1.0 - alpha) * *current;
    }
}

/// Component-wise weighted average of two equal-length vectors.
pub fn weighted_average(a: &[f32], weight_a: f32, b: &[f32], weight_b: f32) -> Vec<f32> {
    let total = weight_a + weight_b;
    let (wa, wb) = if total > 0.0 {
        (weight_a / total, weight_b / total)
    } else {
        (0.5, 0.5)
    };

    a.iter().zip(b.iter()).map(|(x, y)| wa * x + wb * y).collect()
}
