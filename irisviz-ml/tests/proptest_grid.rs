//! Property-based tests for grid construction and reshaping using proptest.

use ndarray::{Array1, Array2};
use proptest::prelude::*;

use irisviz_ml::grid::{Evaluation, Field, linspace, make_grid};

fn feature_matrix() -> impl Strategy<Value = Array2<f64>> {
    (1usize..20, 2usize..=3).prop_flat_map(|(rows, dims)| {
        prop::collection::vec(-100.0f64..100.0, rows * dims)
            .prop_map(move |v| Array2::from_shape_vec((rows, dims), v).unwrap())
    })
}

// --- Cardinality ---

proptest! {
    #[test]
    fn grid_has_r_pow_d_points(
        x in feature_matrix(),
        resolution in 2usize..12,
        margin in 0.0f64..2.0,
    ) {
        let grid = make_grid(x.view(), resolution, margin).unwrap();
        let d = x.ncols() as u32;
        prop_assert_eq!(grid.len(), resolution.pow(d));
        prop_assert_eq!(grid.points().ncols(), x.ncols());
        for axis in grid.axes() {
            prop_assert_eq!(axis.len(), resolution);
        }
    }

    #[test]
    fn linspace_hits_both_endpoints(
        lo in -50.0f64..50.0,
        span in 1e-3f64..50.0,
        n in 2usize..200,
    ) {
        let hi = lo + span;
        let axis = linspace(lo, hi, n);
        prop_assert_eq!(axis[0], lo);
        prop_assert_eq!(axis[n - 1], hi);
        for w in axis.to_vec().windows(2) {
            prop_assert!(w[1] > w[0]);
        }
    }
}

// --- Containment ---

proptest! {
    #[test]
    fn features_lie_strictly_inside_axes(
        x in feature_matrix(),
        resolution in 2usize..8,
        margin in 0.01f64..2.0,
    ) {
        let grid = make_grid(x.view(), resolution, margin).unwrap();
        for (c, axis) in grid.axes().iter().enumerate() {
            let lo = axis[0];
            let hi = axis[resolution - 1];
            for &v in x.column(c) {
                prop_assert!(v > lo && v < hi, "{} not in ({}, {})", v, lo, hi);
            }
        }
    }
}

// --- Reshape round-trip ---

proptest! {
    #[test]
    fn reshaped_cell_matches_flat_point(
        x in feature_matrix(),
        resolution in 2usize..7,
        cell in prop::collection::vec(0usize..7, 3),
    ) {
        let grid = make_grid(x.view(), resolution, 0.5).unwrap();
        let index: Vec<usize> = cell[..grid.dims()].iter().map(|i| i % resolution).collect();

        let flat: Array1<usize> = (0..grid.len()).collect();
        let Field::Classes(field) = grid.reshape(Evaluation::Classes(flat)).unwrap() else {
            panic!("expected class field");
        };
        let row = grid.flat_index(&index).unwrap();
        prop_assert_eq!(field[&index[..]], row);

        let coord = grid.coordinate(&index).unwrap();
        for (axis, (&i, value)) in index.iter().zip(coord).enumerate() {
            prop_assert_eq!(grid.axes()[axis][i], value);
        }
    }

    #[test]
    fn reshaped_probabilities_keep_rows(
        resolution in 2usize..6,
        n_classes in 2usize..4,
    ) {
        let x = ndarray::array![[0.0, 0.0], [1.0, 1.0]];
        let grid = make_grid(x.view(), resolution, 0.0).unwrap();
        let probs = Array2::from_shape_fn((grid.len(), n_classes), |(r, c)| (r * n_classes + c) as f64);
        let Field::Probabilities(field) = grid.reshape(Evaluation::Probabilities(probs.clone())).unwrap() else {
            panic!("expected probability field");
        };
        prop_assert_eq!(field.shape(), &[resolution, resolution, n_classes][..]);
        for i in 0..resolution {
            for j in 0..resolution {
                let row = grid.flat_index(&[i, j]).unwrap();
                for c in 0..n_classes {
                    prop_assert_eq!(field[&[i, j, c][..]], probs[[row, c]]);
                }
            }
        }
    }
}
