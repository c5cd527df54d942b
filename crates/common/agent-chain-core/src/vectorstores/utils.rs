use crate::{Error, Result};

/// Row-wise cosine similarity between two matrices.
///
/// Zero-norm rows compare as 0.0 rather than NaN.
pub fn cosine_similarity(x: &[Vec<f32>], y: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
    if x.is_empty() || y.is_empty() {
        return Ok(vec![vec![]]);
    }

    let m = x[0].len();
    for row in y {
        if row.len() != m {
            return Err(Error::Other(format!(
                "Number of columns in x and y must be the same. x has {} columns and y has {} columns.",
                m,
                row.len()
            )));
        }
    }

    let x_norms: Vec<f32> = x.iter().map(|row| l2_norm(row)).collect();
    let y_norms: Vec<f32> = y.iter().map(|row| l2_norm(row)).collect();

    let mut result = Vec::with_capacity(x.len());
    for (i, x_row) in x.iter().enumerate() {
        let mut row = Vec::with_capacity(y.len());
        for (j, y_row) in y.iter().enumerate() {
            let dot: f32 = x_row.iter().zip(y_row.iter()).map(|(a, b)| a * b).sum();
            let denom = x_norms[i] * y_norms[j];
            let sim = if denom == 0.0 { 0.0 } else { dot / denom };
            row.push(if sim.is_finite() { sim } else { 0.0 });
        }
        result.push(row);
    }

    Ok(result)
}

/// Cosine distance (`1 - similarity`) from `query` to each row of `rows`.
pub fn cosine_distance(query: &[f32], rows: &[Vec<f32>]) -> Result<Vec<f32>> {
    let similarity = cosine_similarity(&[query.to_vec()], rows)?;
    Ok(similarity
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|sim| 1.0 - sim)
        .collect())
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
