use rand::thread_rng;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::error::ModelError;

/// A 2-D random field, row-major, shape (rows, cols).
pub type Field = Vec<Vec<f64>>;

// Upper bound on rejection-sampling rounds before a truncation interval
// is reported as unreachable.
const MAX_SAMPLING_ROUNDS: usize = 1000;

/// Generates 2-D Gaussian random fields of a fixed shape.
///
/// Every cell is an independent draw; no spatial autocorrelation is
/// modelled. The smoothing that introduces spatial structure happens later
/// in the convolution step.
pub struct RandomFieldGenerator {
  rows: usize,
  cols: usize,
}

impl RandomFieldGenerator {
  pub fn new(rows: usize, cols: usize) -> Self {
    RandomFieldGenerator { rows, cols }
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  /// Draw one Gaussian random field.
  ///
  /// Without bounds the field holds rows x cols independent draws from
  /// Normal(mean, std). With both bounds set, standard normal draws are
  /// rejection-sampled against the closed interval [minval, maxval]: the
  /// bounds apply to the Normal(0, 1) draw, not to Normal(mean, std), so
  /// the truncated field holds standardized anomalies. Setting exactly one
  /// bound is an error.
  pub fn sample(
    &self,
    mean: f64,
    std: f64,
    minval: Option<f64>,
    maxval: Option<f64>,
  ) -> Result<Field, ModelError> {
    if !(std > 0.0) {
      return Err(ModelError::NonPositiveStd(std));
    }
    match (minval, maxval) {
      (None, None) => self.gaussian(mean, std),
      (Some(lo), Some(hi)) => self.truncated_gaussian(lo, hi),
      _ => Err(ModelError::MismatchedBounds),
    }
  }

  /// Draw `n` independent random fields with identical parameters.
  pub fn sample_many(
    &self,
    n: usize,
    mean: f64,
    std: f64,
    minval: Option<f64>,
    maxval: Option<f64>,
  ) -> Result<Vec<Field>, ModelError> {
    if n < 1 {
      return Err(ModelError::NoRealizations);
    }
    (0..n).map(|_| self.sample(mean, std, minval, maxval)).collect()
  }

  fn gaussian(&self, mean: f64, std: f64) -> Result<Field, ModelError> {
    let normal = Normal::new(mean, std).map_err(|_| ModelError::NonPositiveStd(std))?;
    let mut rng = thread_rng();

    let mut field = Vec::with_capacity(self.rows);
    for _ in 0..self.rows {
      let row: Vec<f64> = (0..self.cols).map(|_| normal.sample(&mut rng)).collect();
      field.push(row);
    }
    Ok(field)
  }

  fn truncated_gaussian(&self, minval: f64, maxval: f64) -> Result<Field, ModelError> {
    let needed = self.rows * self.cols;
    let mut rng = thread_rng();
    let mut accepted: Vec<f64> = Vec::with_capacity(needed);

    // Draw standard normal samples in batches and keep those inside the
    // interval until enough have accumulated. A degenerate interval far in
    // the tail would loop forever, so the number of rounds is capped.
    let mut rounds = 0;
    while accepted.len() < needed {
      if rounds >= MAX_SAMPLING_ROUNDS {
        return Err(ModelError::IntervalUnreachable {
          min: minval,
          max: maxval,
          rounds,
        });
      }
      rounds += 1;

      for _ in 0..needed {
        let s: f64 = rng.sample(StandardNormal);
        if s >= minval && s <= maxval {
          accepted.push(s);
        }
      }
    }

    // More samples than required may have been accepted; keep the first
    // rows x cols and fill the field row by row.
    accepted.truncate(needed);
    let mut field = Vec::with_capacity(self.rows);
    for row in 0..self.rows {
      field.push(accepted[row * self.cols..(row + 1) * self.cols].to_vec());
    }
    Ok(field)
  }
}
