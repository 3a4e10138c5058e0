use dem_uncertainty::convolution::WindowConvolver;
use dem_uncertainty::data;
use dem_uncertainty::error::ModelError;
use dem_uncertainty::field::{Field, RandomFieldGenerator};
use dem_uncertainty::kernel::{Operator, StatisticalKernel};
use approx::assert_relative_eq;

const NODATA: f64 = -9999.0;

fn kernel(size_x: usize, size_y: usize, operator: Operator) -> StatisticalKernel {
    StatisticalKernel::new(size_x, size_y, NODATA, operator).unwrap()
}

fn constant_field(rows: usize, cols: usize, value: f64) -> Field {
    vec![vec![value; cols]; rows]
}

#[test]
fn test_sample_many_returns_n_fields_of_requested_shape() {
    let generator = RandomFieldGenerator::new(7, 11);
    let fields = generator.sample_many(5, 0.0, 1.0, None, None).unwrap();

    assert_eq!(fields.len(), 5);
    for field in &fields {
        assert_eq!(field.len(), 7);
        for row in field {
            assert_eq!(row.len(), 11);
        }
    }
}

#[test]
fn test_gaussian_sample_converges_to_requested_moments() {
    // 100 x 100 = 10000 samples; the empirical mean and standard deviation
    // must land within +-0.1 of the requested moments.
    let generator = RandomFieldGenerator::new(100, 100);
    let field = generator.sample(0.0, 1.0, None, None).unwrap();

    let values: Vec<f64> = field.iter().flatten().copied().collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    assert!(mean.abs() < 0.1, "empirical mean {} too far from 0", mean);
    assert!(
        (variance.sqrt() - 1.0).abs() < 0.1,
        "empirical std {} too far from 1",
        variance.sqrt()
    );
}

#[test]
fn test_truncated_sample_respects_bounds() {
    // The bounds apply to the standard normal draw, so every element of
    // the returned field must lie inside the closed interval.
    let generator = RandomFieldGenerator::new(50, 50);
    let field = generator.sample(5.0, 2.0, Some(-1.0), Some(1.0)).unwrap();

    for row in &field {
        for &v in row {
            assert!((-1.0..=1.0).contains(&v), "value {} outside [-1, 1]", v);
        }
    }
}

#[test]
fn test_single_truncation_bound_is_rejected() {
    let generator = RandomFieldGenerator::new(4, 4);

    let err = generator.sample(0.0, 1.0, Some(-1.0), None).unwrap_err();
    assert!(matches!(err, ModelError::MismatchedBounds));

    let err = generator.sample(0.0, 1.0, None, Some(1.0)).unwrap_err();
    assert!(matches!(err, ModelError::MismatchedBounds));
}

#[test]
fn test_non_positive_std_is_rejected() {
    let generator = RandomFieldGenerator::new(4, 4);

    assert!(matches!(
        generator.sample(0.0, 0.0, None, None),
        Err(ModelError::NonPositiveStd(_))
    ));
    assert!(matches!(
        generator.sample(0.0, -1.0, None, None),
        Err(ModelError::NonPositiveStd(_))
    ));
}

#[test]
fn test_zero_realizations_is_rejected() {
    let generator = RandomFieldGenerator::new(4, 4);
    assert!(matches!(
        generator.sample_many(0, 0.0, 1.0, None, None),
        Err(ModelError::NoRealizations)
    ));
}

#[test]
fn test_unreachable_truncation_interval_is_reported() {
    // An interval far in the tail of the standard normal is practically
    // never hit; the bounded rejection loop must give up with an error
    // instead of hanging.
    let generator = RandomFieldGenerator::new(10, 10);
    let err = generator.sample(0.0, 1.0, Some(40.0), Some(41.0)).unwrap_err();
    assert!(matches!(err, ModelError::IntervalUnreachable { .. }));
}

#[test]
fn test_mean_convolution_of_constant_grid_is_constant() {
    let input = constant_field(5, 5, 3.25);
    let convolver = WindowConvolver::new(1);
    let result = convolver.convolve(&input, &kernel(3, 3, Operator::Mean)).unwrap();

    assert_eq!(result.rows(), 3);
    assert_eq!(result.cols(), 3);
    for row in &result.values {
        for &v in row {
            assert_relative_eq!(v, 3.25, epsilon = 1e-12);
        }
    }
    assert_eq!(result.empty_windows, 0);
}

#[test]
fn test_output_shape_follows_valid_window_count() {
    let input = constant_field(12, 8, 1.0);
    let convolver = WindowConvolver::new(1);

    let result = convolver.convolve(&input, &kernel(5, 3, Operator::Mean)).unwrap();
    assert_eq!(result.rows(), 8);
    assert_eq!(result.cols(), 6);

    // A 1 x 1 kernel is the identity case: output shape equals input shape.
    let result = convolver.convolve(&input, &kernel(1, 1, Operator::Mean)).unwrap();
    assert_eq!(result.rows(), 12);
    assert_eq!(result.cols(), 8);
}

#[test]
fn test_kernel_larger_than_input_is_rejected() {
    let input = constant_field(5, 5, 1.0);
    let convolver = WindowConvolver::new(1);

    let err = convolver.convolve(&input, &kernel(10, 10, Operator::Mean)).unwrap_err();
    assert!(matches!(err, ModelError::KernelTooLarge { .. }));

    // One oversized dimension is enough to fail
    let err = convolver.convolve(&input, &kernel(3, 6, Operator::Mean)).unwrap_err();
    assert!(matches!(err, ModelError::KernelTooLarge { .. }));
}

#[test]
fn test_zero_kernel_dimension_is_rejected() {
    assert!(matches!(
        StatisticalKernel::new(0, 3, NODATA, Operator::Mean),
        Err(ModelError::EmptyKernel(_, _))
    ));
}

#[test]
fn test_unsupported_operator_name_is_rejected() {
    assert!(matches!(
        Operator::from_name("variance"),
        Err(ModelError::UnsupportedOperator(_))
    ));
    assert_eq!(Operator::from_name("majority").unwrap(), Operator::Majority);
}

#[test]
fn test_majority_returns_most_frequent_value() {
    let input = vec![vec![1.0, 1.0], vec![2.0, 3.0]];
    let convolver = WindowConvolver::new(1);
    let result = convolver.convolve(&input, &kernel(2, 2, Operator::Majority)).unwrap();

    assert_eq!(result.rows(), 1);
    assert_eq!(result.cols(), 1);
    assert_relative_eq!(result.values[0][0], 1.0);
}

#[test]
fn test_majority_tie_breaks_toward_smaller_value() {
    let input = vec![vec![2.0, 2.0], vec![1.0, 1.0]];
    let convolver = WindowConvolver::new(1);
    let result = convolver.convolve(&input, &kernel(2, 2, Operator::Majority)).unwrap();

    assert_relative_eq!(result.values[0][0], 1.0);
}

#[test]
fn test_majority_counts_nodata_cells() {
    // Three of five cells are nodata. Majority does not ignore nodata, so
    // the masked NaN cells hold the majority and the result is NaN. Mean
    // ignores them and averages the two valid cells instead.
    let input = vec![vec![9.0, 9.0, NODATA, NODATA, NODATA]];
    let convolver = WindowConvolver::new(1);

    let mut k = kernel(1, 5, Operator::Majority);
    let result = convolver.convolve(&input, &k).unwrap();
    assert!(result.values[0][0].is_nan());

    k.set_operator(Operator::Mean);
    let result = convolver.convolve(&input, &k).unwrap();
    assert_relative_eq!(result.values[0][0], 9.0);
}

#[test]
fn test_all_nodata_window_yields_nan_without_aborting() {
    let input = constant_field(3, 3, NODATA);
    let convolver = WindowConvolver::new(1);

    for operator in [Operator::Mean, Operator::Median, Operator::Min, Operator::Max] {
        let result = convolver.convolve(&input, &kernel(3, 3, operator)).unwrap();
        assert!(result.values[0][0].is_nan(), "{} of empty window must be NaN", operator.name());
        assert_eq!(result.empty_windows, 1);
    }
}

#[test]
fn test_min_and_max_ignore_nodata() {
    let input = vec![vec![4.0, NODATA, -2.0], vec![NODATA, 7.0, 0.5]];
    let convolver = WindowConvolver::new(1);

    let result = convolver.convolve(&input, &kernel(2, 3, Operator::Min)).unwrap();
    assert_relative_eq!(result.values[0][0], -2.0);

    let result = convolver.convolve(&input, &kernel(2, 3, Operator::Max)).unwrap();
    assert_relative_eq!(result.values[0][0], 7.0);
}

#[test]
fn test_median_averages_middle_values_for_even_count() {
    // Valid values 1, 3, 5, 11 -> median (3 + 5) / 2
    let input = vec![vec![11.0, 3.0], vec![5.0, 1.0]];
    let convolver = WindowConvolver::new(1);
    let result = convolver.convolve(&input, &kernel(2, 2, Operator::Median)).unwrap();

    assert_relative_eq!(result.values[0][0], 4.0);

    // With one cell masked the count is odd and the middle value wins
    let input = vec![vec![11.0, NODATA], vec![5.0, 1.0]];
    let result = convolver.convolve(&input, &kernel(2, 2, Operator::Median)).unwrap();
    assert_relative_eq!(result.values[0][0], 5.0);
}

#[test]
fn test_convolution_is_deterministic() {
    let mut input = constant_field(6, 6, 0.0);
    for (i, row) in input.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (i * 31 + j * 7) as f64 * 0.13 - 2.0;
        }
    }
    input[2][3] = NODATA;

    let convolver = WindowConvolver::new(1);
    let k = kernel(3, 3, Operator::Median);

    let first = convolver.convolve(&input, &k).unwrap();
    let second = convolver.convolve(&input, &k).unwrap();

    for (row_a, row_b) in first.values.iter().zip(second.values.iter()) {
        for (a, b) in row_a.iter().zip(row_b.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[test]
fn test_shift_parameter_has_no_effect_on_visited_windows() {
    let input = vec![
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
        vec![9.0, 10.0, 11.0, 12.0],
    ];
    let k = kernel(2, 2, Operator::Mean);

    let dense = WindowConvolver::new(1).convolve(&input, &k).unwrap();
    let shifted = WindowConvolver::new(3).convolve(&input, &k).unwrap();

    assert_eq!(dense.rows(), shifted.rows());
    assert_eq!(dense.cols(), shifted.cols());
    for (row_a, row_b) in dense.values.iter().zip(shifted.values.iter()) {
        for (a, b) in row_a.iter().zip(row_b.iter()) {
            assert_relative_eq!(*a, *b);
        }
    }
}

#[test]
fn test_median_helper_on_odd_and_even_slices() {
    let mut odd = vec![9.0, 1.0, 5.0];
    assert_relative_eq!(data::median(&mut odd), 5.0);

    let mut even = vec![8.0, 2.0, 4.0, 6.0];
    assert_relative_eq!(data::median(&mut even), 5.0);

    let mut empty: Vec<f64> = vec![];
    assert!(data::median(&mut empty).is_nan());
}
