//! Small materialized aggregates: per-column-per-block (min, max), used by
//! Select (spec §4.5) to skip blocks whose range cannot satisfy a predicate.
//! Ported structurally from `original_source/.../sma.cc`'s `Sma::Search`.

use hustle_core::{CompareOp, Value};

use crate::bitmap::Bitmap;
use crate::column::ColumnBuffer;

/// A column's observed range over its block's live rows. `None` if the
/// block contains no live rows (nothing to skip on, nothing to keep).
#[derive(Debug, Clone)]
pub struct Sma {
    pub min: Value,
    pub max: Value,
}

impl Sma {
    pub fn compute(column: &ColumnBuffer, validity: &Bitmap) -> Option<Self> {
        let mut min: Option<Value> = None;
        let mut max: Option<Value> = None;
        for row in validity.iter_ones() {
            let v = column.get(row);
            if v.is_null() {
                continue;
            }
            min = Some(match min {
                None => v.clone(),
                Some(cur) => {
                    if v.compare(&cur) == Some(std::cmp::Ordering::Less) {
                        v.clone()
                    } else {
                        cur
                    }
                }
            });
            max = Some(match max {
                None => v.clone(),
                Some(cur) => {
                    if v.compare(&cur) == Some(std::cmp::Ordering::Greater) {
                        v
                    } else {
                        cur
                    }
                }
            });
        }
        match (min, max) {
            (Some(min), Some(max)) => Some(Sma { min, max }),
            _ => None,
        }
    }

    /// Whether a block described by this SMA can be proven to contain no
    /// row satisfying `op value [value2]`. `Eq`/`Ne` are never used to
    /// skip, matching the original `Sma::Search`'s unconditional
    /// "cannot rule out" return for those comparators.
    pub fn can_skip(&self, op: CompareOp, value: &Value, value2: Option<&Value>) -> bool {
        use std::cmp::Ordering::*;
        if !op.can_skip_via_range() {
            return false;
        }
        match op {
            CompareOp::Lt => matches!(self.min.compare(value), Some(Greater) | Some(Equal)),
            CompareOp::Le => matches!(self.min.compare(value), Some(Greater)),
            CompareOp::Gt => matches!(self.max.compare(value), Some(Less) | Some(Equal)),
            CompareOp::Ge => matches!(self.max.compare(value), Some(Less)),
            CompareOp::Between => {
                let hi = value2.unwrap_or(value);
                let max_below_lo = matches!(self.max.compare(value), Some(Less));
                let min_above_hi = matches!(self.min.compare(hi), Some(Greater));
                max_below_lo || min_above_hi
            }
            CompareOp::Eq | CompareOp::Ne => false,
        }
    }
}
