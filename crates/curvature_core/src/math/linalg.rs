//! Small dense linear algebra over `Vec<Vec<f64>>`.
//!
//! Calibration systems are tiny (one row per quoted instrument), so plain
//! row-major vectors with direct elimination beat any sparse machinery.
//! All solvers return `None` on a singular or non-positive-definite system
//! and let the caller decide how to report it.

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` if `A` is not square, dimensions disagree, or a pivot
/// is smaller than `1e-14` in magnitude (numerically singular).
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented working copy
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..n {
        // Partial pivot: largest magnitude entry in this column
        let pivot_row = (col..n).max_by(|&i, &j| {
            m[i][col]
                .abs()
                .partial_cmp(&m[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[pivot_row][col].abs() < 1e-14 {
            return None;
        }
        m.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = m[i][n];
        for j in (i + 1)..n {
            sum -= m[i][j] * x[j];
        }
        x[i] = sum / m[i][i];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Invert a square matrix by solving against each unit vector.
///
/// Returns `None` on a singular input.
pub fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut columns = Vec::with_capacity(n);
    for j in 0..n {
        let mut e = vec![0.0; n];
        e[j] = 1.0;
        columns.push(solve(a, &e)?);
    }
    // columns[j][i] is entry (i, j) of the inverse
    let mut inv = vec![vec![0.0; n]; n];
    for (j, col) in columns.iter().enumerate() {
        for (i, &v) in col.iter().enumerate() {
            inv[i][j] = v;
        }
    }
    Some(inv)
}

/// Solve `A x = b` for symmetric positive definite `A` via Cholesky.
///
/// Returns `None` if `A` is not positive definite. Used for the damped
/// normal equations `(J^T J + lambda I)`, which are SPD by construction.
pub fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                if l[j][j].abs() < 1e-30 {
                    return None;
                }
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        if l[i][i].abs() < 1e-30 {
            return None;
        }
        y[i] = sum / l[i][i];
    }

    // L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    Some(x)
}

/// Matrix-vector product.
pub fn matvec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(x).map(|(&r, &v)| r * v).sum())
        .collect()
}

/// Matrix-matrix product.
pub fn matmul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = a.len();
    let inner = b.len();
    let cols = if inner == 0 { 0 } else { b[0].len() };
    let mut out = vec![vec![0.0; cols]; rows];
    for i in 0..rows {
        for k in 0..inner {
            let aik = a[i][k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..cols {
                out[i][j] += aik * b[k][j];
            }
        }
    }
    out
}

/// Matrix transpose.
pub fn transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = a.len();
    let cols = if rows == 0 { 0 } else { a[0].len() };
    let mut out = vec![vec![0.0; rows]; cols];
    for (i, row) in a.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            out[j][i] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Gaussian Elimination Tests
    // ========================================

    #[test]
    fn test_solve_identity() {
        let a = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let x = solve(&a, &[3.0, -4.0]).unwrap();
        assert_relative_eq!(x[0], 3.0);
        assert_relative_eq!(x[1], -4.0);
    }

    #[test]
    fn test_solve_general_3x3() {
        let a = vec![
            vec![2.0, 1.0, -1.0],
            vec![-3.0, -1.0, 2.0],
            vec![-2.0, 1.0, 2.0],
        ];
        let b = [8.0, -11.0, -3.0];
        let x = solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_requires_pivoting() {
        // Zero on the first diagonal entry; fails without row exchange
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let x = solve(&a, &[2.0, 5.0]).unwrap();
        assert_relative_eq!(x[0], 5.0);
        assert_relative_eq!(x[1], 2.0);
    }

    #[test]
    fn test_solve_singular_returns_none() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(&a, &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_solve_dimension_mismatch_returns_none() {
        let a = vec![vec![1.0, 2.0]];
        assert!(solve(&a, &[1.0, 2.0]).is_none());
    }

    // ========================================
    // Inverse Tests
    // ========================================

    #[test]
    fn test_invert_round_trip() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&a).unwrap();
        let prod = matmul(&a, &inv);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[i][j], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_singular_returns_none() {
        let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(invert(&a).is_none());
    }

    // ========================================
    // Cholesky Tests
    // ========================================

    #[test]
    fn test_cholesky_spd() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let x = solve_cholesky(&a, &[1.0, 2.0]).unwrap();
        let back = matvec(&a, &x);
        assert_relative_eq!(back[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(back[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_not_positive_definite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(solve_cholesky(&a, &[1.0, 1.0]).is_none());
    }

    // ========================================
    // Helper Tests
    // ========================================

    #[test]
    fn test_matvec_and_transpose() {
        let a = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let v = matvec(&a, &[1.0, 0.0, -1.0]);
        assert_relative_eq!(v[0], -2.0);
        assert_relative_eq!(v[1], -2.0);

        let t = transpose(&a);
        assert_eq!(t.len(), 3);
        assert_relative_eq!(t[2][1], 6.0);
    }
}
