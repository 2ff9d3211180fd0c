// Integer Histogram
//
// Fixed-width histogram over one integer column, used for selectivity
// estimation. Space and update time are constant in the number of
// values seen: only per-bucket counts are kept, never the values.

use crate::query::executor::predicate::Op;
use crate::query::QueryError;

#[derive(Debug, Clone)]
struct Bucket {
    left: i32,
    right: i32,
    count: usize,
}

impl Bucket {
    fn width(&self) -> i32 {
        self.right - self.left + 1
    }
}

#[derive(Debug, Clone)]
pub struct IntHistogram {
    buckets: Vec<Bucket>,
    min: i32,
    max: i32,
    width: f64,
    ntups: usize,
}

impl IntHistogram {
    /// A histogram of `buckets` equal-width buckets covering
    /// `[min, max]`. When there are more buckets than distinct values,
    /// ranges collapse to a single value rather than going empty.
    pub fn new(buckets: usize, min: i32, max: i32) -> Self {
        let width = (max as f64 - min as f64 + 1.0) / buckets as f64;
        let buckets = (0..buckets)
            .map(|i| {
                let left = (min as f64 + i as f64 * width).ceil() as i32;
                let right = ((min as f64 + (i + 1) as f64 * width).ceil() as i32 - 1).max(left);
                Bucket {
                    left,
                    right,
                    count: 0,
                }
            })
            .collect();
        IntHistogram {
            buckets,
            min,
            max,
            width,
            ntups: 0,
        }
    }

    fn index(&self, v: i32) -> isize {
        ((v as f64 - self.min as f64) / self.width).floor() as isize
    }

    /// Record one value.
    pub fn add_value(&mut self, v: i32) -> Result<(), QueryError> {
        if v < self.min || v > self.max {
            return Err(QueryError::ValueOutOfRange {
                value: v,
                min: self.min,
                max: self.max,
            });
        }
        let idx = self.index(v) as usize;
        self.buckets[idx].count += 1;
        self.ntups += 1;
        Ok(())
    }

    /// Estimated fraction of recorded values satisfying `op v`.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> Result<f64, QueryError> {
        let n = self.buckets.len() as isize;
        let ntups = self.ntups as f64;
        match op {
            Op::Equals => {
                let i = self.index(v);
                if i < 0 || i >= n {
                    return Ok(0.0);
                }
                let b = &self.buckets[i as usize];
                Ok((b.count as f64 / b.width() as f64) / ntups)
            }
            Op::GreaterThan => {
                let i = self.index(v);
                if i < 0 {
                    return Ok(1.0);
                }
                if i >= n {
                    return Ok(0.0);
                }
                let b = &self.buckets[i as usize];
                let mut sum = (b.right as f64 - v as f64) * b.count as f64 / b.width() as f64;
                for bucket in &self.buckets[i as usize + 1..] {
                    sum += bucket.count as f64;
                }
                Ok(sum / ntups)
            }
            Op::LessThan => {
                let i = self.index(v);
                if i < 0 {
                    return Ok(0.0);
                }
                if i >= n {
                    return Ok(1.0);
                }
                let b = &self.buckets[i as usize];
                let mut sum = (v as f64 - b.left as f64) * b.count as f64 / b.width() as f64;
                for bucket in &self.buckets[..i as usize] {
                    sum += bucket.count as f64;
                }
                Ok(sum / ntups)
            }
            Op::NotEquals => Ok(1.0 - self.estimate_selectivity(Op::Equals, v)?),
            Op::LessThanOrEq => Ok(1.0 - self.estimate_selectivity(Op::GreaterThan, v)?),
            Op::GreaterThanOrEq => Ok(1.0 - self.estimate_selectivity(Op::LessThan, v)?),
            Op::Like => Err(QueryError::UnsupportedPredicate(op)),
        }
    }
}
