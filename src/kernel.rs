use crate::data;
use crate::error::ModelError;

/// Statistical reduction applied to each kernel window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Mean,
  Median,
  Min,
  Max,
  Majority,
}

impl Operator {
  /// Parse an operator name as given on the command line.
  pub fn from_name(name: &str) -> Result<Self, ModelError> {
    match name {
      "mean" => Ok(Operator::Mean),
      "median" => Ok(Operator::Median),
      "min" => Ok(Operator::Min),
      "max" => Ok(Operator::Max),
      "majority" => Ok(Operator::Majority),
      _ => Err(ModelError::UnsupportedOperator(name.to_string())),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Operator::Mean => "mean",
      Operator::Median => "median",
      Operator::Min => "min",
      Operator::Max => "max",
      Operator::Majority => "majority",
    }
  }
}

/// Reduces one kernel window (a block of grid values) to a single scalar.
///
/// The window dimensions, the nodata value of the source raster and the
/// reduction operator are bound at construction. The operator may be
/// swapped between convolution passes with `set_operator`; during a pass
/// the kernel is only handed out by shared reference.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalKernel {
  size_x: usize,
  size_y: usize,
  nodata_value: f64,
  operator: Operator,
}

impl StatisticalKernel {
  pub fn new(
    size_x: usize,
    size_y: usize,
    nodata_value: f64,
    operator: Operator,
  ) -> Result<Self, ModelError> {
    if size_x < 1 || size_y < 1 {
      return Err(ModelError::EmptyKernel(size_x, size_y));
    }
    Ok(StatisticalKernel {
      size_x,
      size_y,
      nodata_value,
      operator,
    })
  }

  pub fn size_x(&self) -> usize {
    self.size_x
  }

  pub fn size_y(&self) -> usize {
    self.size_y
  }

  pub fn operator(&self) -> Operator {
    self.operator
  }

  pub fn set_operator(&mut self, operator: Operator) {
    self.operator = operator;
  }

  /// Reduce one flattened window of values to a scalar.
  ///
  /// Cells equal to the nodata value are replaced with NaN once, up front.
  /// Mean, median, min and max reduce over the remaining valid values and
  /// yield NaN when none are left. Majority counts raw distinct values
  /// with NaN entries included (all NaN cells count as one value); a tie
  /// is broken toward the value that sorts first in ascending order, NaN
  /// ordered last.
  pub fn apply(&self, values: &[f64]) -> f64 {
    let mut masked: Vec<f64> = values
      .iter()
      .map(|&v| if v == self.nodata_value { f64::NAN } else { v })
      .collect();

    match self.operator {
      Operator::Mean => {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in &masked {
          if !v.is_nan() {
            sum += v;
            count += 1;
          }
        }
        if count == 0 {
          f64::NAN
        } else {
          sum / count as f64
        }
      }
      Operator::Median => {
        masked.retain(|v| !v.is_nan());
        data::median(&mut masked)
      }
      // f64::min/max ignore a NaN operand, so an all-NaN window folds to
      // the NaN initial value.
      Operator::Min => masked.iter().copied().fold(f64::NAN, f64::min),
      Operator::Max => masked.iter().copied().fold(f64::NAN, f64::max),
      Operator::Majority => majority(&mut masked),
    }
  }
}

// Most frequent distinct value of the slice. Sorting groups equal values
// into runs (all NaN entries form one run at the end); the first run with
// the highest count wins, so ties go to the smaller value.
fn majority(values: &mut [f64]) -> f64 {
  values.sort_unstable_by(|a, b| a.total_cmp(b));

  let mut best = f64::NAN;
  let mut best_count = 0;
  let mut i = 0;
  while i < values.len() {
    let v = values[i];
    let mut j = i + 1;
    while j < values.len() && (values[j] == v || (values[j].is_nan() && v.is_nan())) {
      j += 1;
    }
    if j - i > best_count {
      best_count = j - i;
      best = v;
    }
    i = j;
  }
  best
}
