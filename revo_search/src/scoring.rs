use serde_json::Value;

/// Cosine similarity between two embedding vectors.
///
/// Returns 0.0 when the lengths differ or either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, mag_a, mag_b) = a.iter().zip(b).fold((0.0_f64, 0.0_f64, 0.0_f64), |acc, (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (x.mul_add(y, acc.0), x.mul_add(x, acc.1), y.mul_add(y, acc.2))
    });

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Read a stored embedding out of a JSON document field.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn vector_from_json(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|x| x as f32))
        .collect()
}

/// Render a vector as a pgvector text literal, e.g. `[0.1,0.2]`.
#[must_use]
pub fn pgvector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(f32::to_string).collect();
    format!("[{}]", parts.join(","))
}
