//! Predicate comparators (spec §4.5: "comparator ∈ {=, ≠, <, ≤, >, ≥, BETWEEN}").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Inclusive range `[value, value2]`. NOT is expressed by negating
    /// comparators elsewhere rather than by a dedicated `NotBetween` (spec
    /// §4.5: "NOT is expressed by negating comparators").
    Between,
}

impl CompareOp {
    /// The comparator's SMA-skip role (spec §4.5 / `sma.cc`): whether a
    /// block can be skipped based on its column range alone. `=`/`≠` are
    /// never used to skip, matching the original's `Sma::Search` which
    /// returns `true` (cannot rule out) for `EQUAL`/`NOT_EQUAL`.
    pub fn can_skip_via_range(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}
