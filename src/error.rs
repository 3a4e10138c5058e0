use thiserror::Error;

/// Errors raised by the uncertainty model core.
///
/// All variants describe malformed configuration and are raised at the
/// point of the bad call, before any scenario work starts. Degenerate
/// windows (all cells nodata) are not errors; they reduce to NaN and are
/// reported as a warning by the caller.
#[derive(Error, Debug)]
pub enum ModelError {
  #[error("operator '{0}' is not supported")]
  UnsupportedOperator(String),

  #[error("if minval is unset, maxval must also be unset, and vice versa")]
  MismatchedBounds,

  #[error("standard deviation must be positive, got {0}")]
  NonPositiveStd(f64),

  #[error("number of realizations must be at least 1")]
  NoRealizations,

  #[error("kernel dimensions must be at least 1 x 1, got {0} x {1}")]
  EmptyKernel(usize, usize),

  #[error("kernel ({kx} x {ky}) larger than input grid ({rows} x {cols})")]
  KernelTooLarge {
    kx: usize,
    ky: usize,
    rows: usize,
    cols: usize,
  },

  #[error("truncation interval [{min}, {max}] is rarely satisfied, gave up after {rounds} sampling rounds")]
  IntervalUnreachable { min: f64, max: f64, rounds: usize },
}
