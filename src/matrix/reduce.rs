//! Reductions over the whole matrix, per column and per row. Missing values are IEEE NaN.
//! Without `skip_missing` any NaN input turns the affected output into NaN. With
//! `skip_missing` NaN inputs are dropped; an all-missing input yields NaN for mean, variance
//! and median, zero for sums, and the reduction identity plus a warning for the min/max family.
//!
//! Per-column reductions consume the columns resident in the buffer first, per-row reductions
//! iterate columns outer and rows inner over a full-height accumulator. Either way each cell is
//! read exactly once, which is what makes single-pass recurrences worth it here: a read may
//! cost disk traffic.

use log::warn;

use crate::{DiskMatrix, Error};

impl DiskMatrix {
    /// Smallest value of the matrix. All-missing input yields positive infinity under
    /// `skip_missing` and logs a warning.
    pub fn min(&mut self, skip_missing: bool) -> Result<f64, Error> {
        self.extreme(skip_missing, f64::INFINITY, |new, best| new < best)
    }

    /// Largest value of the matrix. All-missing input yields negative infinity under
    /// `skip_missing` and logs a warning.
    pub fn max(&mut self, skip_missing: bool) -> Result<f64, Error> {
        self.extreme(skip_missing, f64::NEG_INFINITY, |new, best| new > best)
    }

    fn extreme(
        &mut self,
        skip_missing: bool,
        identity: f64,
        better: impl Fn(f64, f64) -> bool,
    ) -> Result<f64, Error> {
        let mut best = identity;
        let mut found = false;
        for col in self.column_order() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        return Ok(f64::NAN);
                    }
                } else {
                    if better(value, best) {
                        best = value;
                    }
                    found = true;
                }
            }
        }
        if !found {
            warn!("matrix contains no non-missing values, reporting the reduction identity");
        }
        Ok(best)
    }

    /// Sum over every cell. An all-missing input sums to zero under `skip_missing`.
    pub fn sum(&mut self, skip_missing: bool) -> Result<f64, Error> {
        let mut sum = 0.0;
        for col in self.column_order() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        return Ok(f64::NAN);
                    }
                } else {
                    sum += value;
                }
            }
        }
        Ok(sum)
    }

    /// Arithmetic mean over every cell.
    pub fn mean(&mut self, skip_missing: bool) -> Result<f64, Error> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for col in self.column_order() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        return Ok(f64::NAN);
                    }
                } else {
                    sum += value;
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Ok(f64::NAN);
        }
        Ok(sum / count as f64)
    }

    /// Sample variance over every cell, accumulated with the single pass Welford recurrence so
    /// each cell is read only once. Fewer than two non-missing inputs yield NaN.
    pub fn var(&mut self, skip_missing: bool) -> Result<f64, Error> {
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut sum_squares = 0.0;
        for col in self.column_order() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        return Ok(f64::NAN);
                    }
                } else {
                    count += 1;
                    sum_squares +=
                        (count - 1) as f64 / count as f64 * (value - mean) * (value - mean);
                    mean += (value - mean) / count as f64;
                }
            }
        }
        if count < 2 {
            return Ok(f64::NAN);
        }
        Ok(sum_squares / (count - 1) as f64)
    }

    /// Mean of every column.
    pub fn col_means(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        for col in self.column_order() {
            out[col] = self.single_col_mean(col, skip_missing)?;
        }
        Ok(out)
    }

    /// Sum of every column.
    pub fn col_sums(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        for col in self.column_order() {
            out[col] = self.single_col_sum(col, skip_missing)?;
        }
        Ok(out)
    }

    /// Sample variance of every column.
    pub fn col_vars(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        for col in self.column_order() {
            out[col] = self.single_col_var(col, skip_missing)?;
        }
        Ok(out)
    }

    /// Largest value of every column.
    pub fn col_max(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        for col in self.column_order() {
            out[col] =
                self.single_col_extreme(col, skip_missing, f64::NEG_INFINITY, |new, best| {
                    new > best
                })?;
        }
        Ok(out)
    }

    /// Smallest value of every column.
    pub fn col_min(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        for col in self.column_order() {
            out[col] = self.single_col_extreme(col, skip_missing, f64::INFINITY, |new, best| {
                new < best
            })?;
        }
        Ok(out)
    }

    /// Median of every column, obtained through partial selection on a scratch buffer. An even
    /// number of inputs averages the two middle elements.
    pub fn col_medians(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.cols()];
        let mut scratch = Vec::with_capacity(self.rows());
        for col in self.column_order() {
            scratch.clear();
            let mut missing = false;
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing = true;
                        break;
                    }
                } else {
                    scratch.push(value);
                }
            }
            out[col] = if missing {
                f64::NAN
            } else {
                median_of(&mut scratch)
            };
        }
        Ok(out)
    }

    /// Smallest and largest value of every column, found in one pass over adjacent pairs: the
    /// smaller of each pair is held against the running minimum, the larger against the running
    /// maximum, three comparisons per pair instead of four.
    pub fn col_ranges(&mut self, skip_missing: bool) -> Result<Vec<(f64, f64)>, Error> {
        let mut out = vec![(0.0, 0.0); self.cols()];
        for col in self.column_order() {
            out[col] = self.single_col_range(col, skip_missing)?;
        }
        Ok(out)
    }

    /// Mean of every row.
    pub fn row_means(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut sums = vec![0.0; self.rows()];
        let mut counts = vec![0usize; self.rows()];
        let mut missing = vec![false; self.rows()];
        for col in 0..self.cols() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing[row] = true;
                    }
                } else {
                    sums[row] += value;
                    counts[row] += 1;
                }
            }
        }
        Ok(sums
            .into_iter()
            .zip(counts)
            .zip(missing)
            .map(|((sum, count), missing)| {
                if missing || count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            })
            .collect())
    }

    /// Sum of every row.
    pub fn row_sums(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut sums = vec![0.0; self.rows()];
        let mut missing = vec![false; self.rows()];
        for col in 0..self.cols() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing[row] = true;
                    }
                } else {
                    sums[row] += value;
                }
            }
        }
        for (sum, missing) in sums.iter_mut().zip(missing) {
            if missing {
                *sum = f64::NAN;
            }
        }
        Ok(sums)
    }

    /// Sample variance of every row, Welford recurrence held in full-height accumulators.
    pub fn row_vars(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut counts = vec![0usize; self.rows()];
        let mut means = vec![0.0; self.rows()];
        let mut sum_squares = vec![0.0; self.rows()];
        let mut missing = vec![false; self.rows()];
        for col in 0..self.cols() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing[row] = true;
                    }
                } else {
                    counts[row] += 1;
                    let count = counts[row] as f64;
                    sum_squares[row] +=
                        (count - 1.0) / count * (value - means[row]) * (value - means[row]);
                    means[row] += (value - means[row]) / count;
                }
            }
        }
        Ok(counts
            .into_iter()
            .zip(sum_squares)
            .zip(missing)
            .map(|((count, sum_squares), missing)| {
                if missing || count < 2 {
                    f64::NAN
                } else {
                    sum_squares / (count - 1) as f64
                }
            })
            .collect())
    }

    /// Largest value of every row.
    pub fn row_max(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        self.row_extreme(skip_missing, f64::NEG_INFINITY, |new, best| new > best)
    }

    /// Smallest value of every row.
    pub fn row_min(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        self.row_extreme(skip_missing, f64::INFINITY, |new, best| new < best)
    }

    /// Median of every row. Works in either mode, but only row mode keeps the band resident, so
    /// that is the mode in which calling this makes sense.
    pub fn row_medians(&mut self, skip_missing: bool) -> Result<Vec<f64>, Error> {
        let mut out = vec![0.0; self.rows()];
        let mut scratch = Vec::with_capacity(self.cols());
        for row in 0..self.rows() {
            scratch.clear();
            let mut missing = false;
            for col in 0..self.cols() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing = true;
                        break;
                    }
                } else {
                    scratch.push(value);
                }
            }
            out[row] = if missing {
                f64::NAN
            } else {
                median_of(&mut scratch)
            };
        }
        Ok(out)
    }

    fn row_extreme(
        &mut self,
        skip_missing: bool,
        identity: f64,
        better: impl Fn(f64, f64) -> bool,
    ) -> Result<Vec<f64>, Error> {
        let mut out = vec![identity; self.rows()];
        let mut found = vec![false; self.rows()];
        let mut missing = vec![false; self.rows()];
        for col in 0..self.cols() {
            for row in 0..self.rows() {
                let value = *self.locate(row, col)?;
                if value.is_nan() {
                    if !skip_missing {
                        missing[row] = true;
                    }
                } else {
                    if better(value, out[row]) {
                        out[row] = value;
                    }
                    found[row] = true;
                }
            }
        }
        let mut all_missing = 0;
        for row in 0..self.rows() {
            if missing[row] {
                out[row] = f64::NAN;
            } else if !found[row] {
                all_missing += 1;
            }
        }
        if all_missing > 0 {
            warn!(
                "{all_missing} row(s) contain no non-missing values, reporting the reduction \
                identity for them"
            );
        }
        Ok(out)
    }

    fn single_col_mean(&mut self, col: usize, skip_missing: bool) -> Result<f64, Error> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in 0..self.rows() {
            let value = *self.locate(row, col)?;
            if value.is_nan() {
                if !skip_missing {
                    return Ok(f64::NAN);
                }
            } else {
                sum += value;
                count += 1;
            }
        }
        if count == 0 {
            return Ok(f64::NAN);
        }
        Ok(sum / count as f64)
    }

    fn single_col_sum(&mut self, col: usize, skip_missing: bool) -> Result<f64, Error> {
        let mut sum = 0.0;
        for row in 0..self.rows() {
            let value = *self.locate(row, col)?;
            if value.is_nan() {
                if !skip_missing {
                    return Ok(f64::NAN);
                }
            } else {
                sum += value;
            }
        }
        Ok(sum)
    }

    fn single_col_var(&mut self, col: usize, skip_missing: bool) -> Result<f64, Error> {
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut sum_squares = 0.0;
        for row in 0..self.rows() {
            let value = *self.locate(row, col)?;
            if value.is_nan() {
                if !skip_missing {
                    return Ok(f64::NAN);
                }
            } else {
                count += 1;
                sum_squares +=
                    (count - 1) as f64 / count as f64 * (value - mean) * (value - mean);
                mean += (value - mean) / count as f64;
            }
        }
        if count < 2 {
            return Ok(f64::NAN);
        }
        Ok(sum_squares / (count - 1) as f64)
    }

    fn single_col_extreme(
        &mut self,
        col: usize,
        skip_missing: bool,
        identity: f64,
        better: impl Fn(f64, f64) -> bool,
    ) -> Result<f64, Error> {
        let mut best = identity;
        let mut found = false;
        for row in 0..self.rows() {
            let value = *self.locate(row, col)?;
            if value.is_nan() {
                if !skip_missing {
                    return Ok(f64::NAN);
                }
            } else {
                if better(value, best) {
                    best = value;
                }
                found = true;
            }
        }
        if !found {
            warn!(
                "column {col} contains no non-missing values, reporting the reduction identity"
            );
        }
        Ok(best)
    }

    fn single_col_range(&mut self, col: usize, skip_missing: bool) -> Result<(f64, f64), Error> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut found = false;
        let mut row = 0;
        if self.rows() % 2 == 1 {
            // Odd number of rows: seed from row zero, pair up from row one.
            let value = *self.locate(0, col)?;
            if value.is_nan() {
                if !skip_missing {
                    return Ok((f64::NAN, f64::NAN));
                }
            } else {
                lo = value;
                hi = value;
                found = true;
            }
            row = 1;
        }
        while row + 1 < self.rows() {
            let first = *self.locate(row, col)?;
            let second = *self.locate(row + 1, col)?;
            if first.is_nan() || second.is_nan() {
                if !skip_missing {
                    return Ok((f64::NAN, f64::NAN));
                }
                for value in [first, second] {
                    if value.is_nan() {
                        continue;
                    }
                    if value < lo {
                        lo = value;
                    }
                    if value > hi {
                        hi = value;
                    }
                    found = true;
                }
            } else {
                let (small, large) = if first < second {
                    (first, second)
                } else {
                    (second, first)
                };
                if small < lo {
                    lo = small;
                }
                if large > hi {
                    hi = large;
                }
                found = true;
            }
            row += 2;
        }
        if !found {
            warn!(
                "column {col} contains no non-missing values, reporting the reduction identity"
            );
        }
        Ok((lo, hi))
    }
}

/// Median through partial selection, the same `nth_element` style routine twice for the even
/// case. Mutates `values` by partially sorting it. An empty slice yields NaN.
fn median_of(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        let (_, middle, _) = values.select_nth_unstable_by((n - 1) / 2, f64::total_cmp);
        *middle
    } else {
        let (_, upper, _) = values.select_nth_unstable_by(n / 2, f64::total_cmp);
        let upper = *upper;
        let (_, lower, _) = values.select_nth_unstable_by(n / 2 - 1, f64::total_cmp);
        (upper + *lower) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::median_of;

    #[test]
    fn median_of_odd_count_is_the_middle_element() {
        assert_eq!(median_of(&mut [5., 1., 3.]), 3.);
    }

    #[test]
    fn median_of_even_count_averages_the_two_middle_elements() {
        assert_eq!(median_of(&mut [4., 1., 3., 2.]), 2.5);
    }

    #[test]
    fn median_of_nothing_is_missing() {
        assert!(median_of(&mut []).is_nan());
    }

    #[test]
    fn median_of_a_single_element_is_that_element() {
        assert_eq!(median_of(&mut [7.]), 7.);
    }
}
