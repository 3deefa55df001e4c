//! Pearson correlation over pairwise-complete observations.

/// Pearson correlation of two columns, using only rows where both values
/// are present. `None` when fewer than two such rows exist or either side
/// has zero variance.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Symmetric correlation matrix across columns. The diagonal is always 1.
pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<Option<f64>>> {
    let n = columns.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        matrix[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_perfect_correlation() {
        let r = pearson(&col(&[1.0, 2.0, 3.0]), &col(&[2.0, 4.0, 6.0])).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let r = pearson(&col(&[1.0, 2.0, 3.0]), &col(&[3.0, 2.0, 1.0])).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_complete() {
        let a = vec![Some(1.0), None, Some(2.0), Some(3.0)];
        let b = vec![Some(10.0), Some(99.0), Some(20.0), Some(30.0)];
        let r = pearson(&a, &b).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_correlation() {
        assert_eq!(pearson(&col(&[1.0, 1.0, 1.0]), &col(&[1.0, 2.0, 3.0])), None);
        assert_eq!(pearson(&col(&[1.0]), &col(&[2.0])), None);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let columns = vec![
            col(&[1.0, 2.0, 3.0, 4.0]),
            col(&[2.0, 1.0, 4.0, 3.0]),
            col(&[5.0, 5.0, 5.0, 5.0]),
        ];
        let m = correlation_matrix(&columns);

        for (i, row) in m.iter().enumerate() {
            assert_eq!(row[i], Some(1.0));
            for (j, value) in row.iter().enumerate() {
                assert_eq!(*value, m[j][i]);
            }
        }
        assert_eq!(m[0][2], None);
        assert!((m[0][1].unwrap() - 0.6).abs() < 1e-12);
    }
}
