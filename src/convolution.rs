use crate::error::ModelError;
use crate::field::Field;
use crate::kernel::{Operator, StatisticalKernel};

/// Output of one convolution pass.
#[derive(Debug)]
pub struct ConvolutionResult {
  /// Reduced values, shape (R - kx + 1, C - ky + 1).
  pub values: Vec<Vec<f64>>,
  /// Number of windows without a single valid value; their reduction
  /// yielded NaN.
  pub empty_windows: usize,
}

impl ConvolutionResult {
  pub fn rows(&self) -> usize {
    self.values.len()
  }

  pub fn cols(&self) -> usize {
    self.values.first().map_or(0, |row| row.len())
  }
}

/// Slides a statistical kernel over a grid and reduces every valid window.
///
/// Only fully in-bounds windows are visited; nothing is padded or wrapped,
/// so the output is always smaller than the input (except for a 1 x 1
/// kernel). The output is a pure function of the input grid and the kernel
/// configuration.
pub struct WindowConvolver {
  step: usize,
}

impl WindowConvolver {
  /// `step` is kept for compatibility with the original interface but has
  /// no effect: every valid window is visited with stride 1 in both axes.
  pub fn new(step: usize) -> Self {
    WindowConvolver { step }
  }

  pub fn step(&self) -> usize {
    self.step
  }

  /// Convolve `input` with the kernel's statistical operator.
  ///
  /// Fails if the kernel is larger than the input in either dimension.
  /// Windows consisting entirely of nodata reduce to NaN and are counted
  /// in the result instead of aborting the pass.
  pub fn convolve(
    &self,
    input: &Field,
    kernel: &StatisticalKernel,
  ) -> Result<ConvolutionResult, ModelError> {
    let rows = input.len();
    let cols = input.first().map_or(0, |row| row.len());
    let kx = kernel.size_x();
    let ky = kernel.size_y();

    if kx > rows || ky > cols {
      return Err(ModelError::KernelTooLarge { kx, ky, rows, cols });
    }

    let out_rows = rows - kx + 1;
    let out_cols = cols - ky + 1;

    let mut empty_windows = 0;
    let mut window: Vec<f64> = Vec::with_capacity(kx * ky);
    let mut values = Vec::with_capacity(out_rows);

    for i in 0..out_rows {
      let mut out_row = Vec::with_capacity(out_cols);
      for j in 0..out_cols {
        window.clear();
        for r in i..i + kx {
          window.extend_from_slice(&input[r][j..j + ky]);
        }

        let reduced = kernel.apply(&window);
        // Majority legitimately returns NaN when NaN cells hold the
        // majority; only the nodata-ignoring operators signal an empty
        // window this way.
        if reduced.is_nan() && kernel.operator() != Operator::Majority {
          empty_windows += 1;
        }
        out_row.push(reduced);
      }
      values.push(out_row);
    }

    Ok(ConvolutionResult {
      values,
      empty_windows,
    })
  }
}
