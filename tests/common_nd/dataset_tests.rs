use approx::assert_abs_diff_eq;
use ndarray::{Array1, array};

use loopte::estimators::approaches::common_nd::dataset::NdDataset;

#[test]
fn nd_dataset_from_columns_construction() {
    let a: Array1<f64> = array![0.0, 1.0, 0.0, 1.0];
    let b: Array1<f64> = array![0.0, 0.0, 1.0, 1.0];
    let ds = NdDataset::<2>::from_columns([a.view(), b.view()]);
    assert_eq!(ds.n, 4);
    assert_eq!(ds.points.len(), 4);
    // spot-check point contents
    assert_abs_diff_eq!(ds.points[2][1], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(ds.points[1][0], 1.0, epsilon = 1e-12);

    // rows of the by-row view are the original columns
    let by_row = ds.variables_by_row();
    assert_eq!(by_row.dim(), (2, 4));
    assert_eq!(by_row.row(0), a);
    assert_eq!(by_row.row(1), b);
}

#[test]
fn nd_dataset_within_matches_brute_force() {
    let points: Vec<[f64; 2]> = (0..50)
        .map(|i| {
            let t = i as f64 * 0.37;
            [t.sin() * 3.0, t.cos() * 2.0 + 0.1 * i as f64]
        })
        .collect();
    let ds = NdDataset::from_points(points.clone());
    let query = [0.5, 1.0];
    for &radius_sq in &[0.25, 1.0, 4.0, 100.0] {
        let mut found = ds.within(&query, radius_sq);
        found.sort_unstable();
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[0] - query[0]).powi(2) + (p[1] - query[1]).powi(2) <= radius_sq)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(found, expected, "radius_sq = {radius_sq}");
    }
}
