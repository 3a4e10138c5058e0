// Order statistics over window samples. NaN entries must be filtered out
// by the caller before these are applied.

// Find the k-th smallest element (0-based). Reorders the slice.
pub fn kth_smallest(values: &mut [f64], k: usize) -> f64 {
  let (_, kth, _) = values.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
  *kth
}

// Compute the median, averaging the two middle elements for an even count.
// Reorders the slice. An empty slice yields NaN.
pub fn median(values: &mut [f64]) -> f64 {
  let n = values.len();
  if n == 0 {
    return f64::NAN;
  }
  let mid = n / 2;
  let upper = kth_smallest(values, mid);
  if n % 2 == 1 {
    upper
  } else {
    // After selection everything left of mid is <= upper, so the lower
    // middle element is the maximum of that part.
    let lower = values[..mid].iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    0.5 * (lower + upper)
  }
}
