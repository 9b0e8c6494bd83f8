//! Predicate trees (spec §4.5): leaves compare a column against a literal,
//! internal nodes are binary AND/OR connectives. NOT is expressed by
//! negating a leaf's comparator rather than by a dedicated node.

use std::cmp::Ordering;

use hustle_core::{CompareOp, Value};
use hustle_storage::{Bitmap, Block};

use crate::reference::ColumnReference;

#[derive(Debug, Clone)]
pub enum PredicateTree {
    Leaf {
        column: ColumnReference,
        op: CompareOp,
        value: Value,
        /// Present only for `Between`: the inclusive upper bound.
        value2: Option<Value>,
    },
    And(Box<PredicateTree>, Box<PredicateTree>),
    Or(Box<PredicateTree>, Box<PredicateTree>),
}

impl PredicateTree {
    pub fn leaf(column: ColumnReference, op: CompareOp, value: Value) -> Self {
        Self::Leaf {
            column,
            op,
            value,
            value2: None,
        }
    }

    pub fn between(column: ColumnReference, lo: Value, hi: Value) -> Self {
        Self::Leaf {
            column,
            op: CompareOp::Between,
            value: lo,
            value2: Some(hi),
        }
    }

    pub fn and(self, other: PredicateTree) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: PredicateTree) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Whether this predicate (or one of its leaves) cannot possibly be
    /// satisfied by `block`, per the block's SMA (spec §4.5 step (i)). A
    /// conjunction can be skipped if either side can; a disjunction only
    /// if both sides can.
    pub fn block_always_false(&self, block: &Block) -> bool {
        match self {
            Self::Leaf {
                column, op, value, value2,
            } => match block.sma(column.index) {
                Some(sma) => sma.can_skip(*op, value, value2.as_ref()),
                None => block.row_count() == 0,
            },
            Self::And(l, r) => l.block_always_false(block) || r.block_always_false(block),
            Self::Or(l, r) => l.block_always_false(block) && r.block_always_false(block),
        }
    }

    /// Evaluates the tree against every live row of `block`, producing a
    /// bitmap already masked by the block's validity bitmap (spec §4.5
    /// step (iii)).
    pub fn eval_block(&self, block: &Block) -> Bitmap {
        if self.block_always_false(block) {
            return Bitmap::all_false(block.row_count());
        }
        let raw = self.eval_block_unmasked(block);
        raw.and(block.validity())
    }

    fn eval_block_unmasked(&self, block: &Block) -> Bitmap {
        match self {
            Self::Leaf {
                column, op, value, value2,
            } => {
                let col = block
                    .column(column.index)
                    .expect("resolver validated column index against schema");
                let mut bitmap = Bitmap::with_capacity(block.row_count());
                for row in 0..block.row_count() {
                    bitmap.push(matches_leaf(*op, &col.get(row), value, value2.as_ref()));
                }
                bitmap
            }
            Self::And(l, r) => l.eval_block_unmasked(block).and(&r.eval_block_unmasked(block)),
            Self::Or(l, r) => l.eval_block_unmasked(block).or(&r.eval_block_unmasked(block)),
        }
    }
}

/// Leaf comparison semantics. Null values never satisfy any comparator,
/// including `Ne` (three-valued SQL logic, not C-style `!=`).
fn matches_leaf(op: CompareOp, cell: &Value, literal: &Value, literal2: Option<&Value>) -> bool {
    if cell.is_null() {
        return false;
    }
    match op {
        CompareOp::Eq => cell.compare(literal) == Some(Ordering::Equal),
        CompareOp::Ne => !matches!(cell.compare(literal), Some(Ordering::Equal) | None),
        CompareOp::Lt => cell.compare(literal) == Some(Ordering::Less),
        CompareOp::Le => matches!(cell.compare(literal), Some(Ordering::Less) | Some(Ordering::Equal)),
        CompareOp::Gt => cell.compare(literal) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(cell.compare(literal), Some(Ordering::Greater) | Some(Ordering::Equal)),
        CompareOp::Between => {
            let hi = literal2.unwrap_or(literal);
            matches!(cell.compare(literal), Some(Ordering::Greater) | Some(Ordering::Equal))
                && matches!(cell.compare(hi), Some(Ordering::Less) | Some(Ordering::Equal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hustle_core::{Column, ColumnType, Schema};
    use hustle_storage::Table;

    fn table_with_rows(values: &[i64]) -> Table {
        let schema = Schema::new(vec![Column::new("id", ColumnType::Int64)]);
        let table = Table::new(schema, 4096);
        for v in values {
            table.insert_record(&[Value::Int(*v)]).unwrap();
        }
        table
    }

    #[test]
    fn leaf_eq_matches_only_equal_rows() {
        let table = table_with_rows(&[1, 2, 3, 2]);
        let pred = PredicateTree::leaf(ColumnReference::new("t", 0), CompareOp::Eq, Value::Int(2));
        table.for_each_block(|_, block| {
            let bm = pred.eval_block(block);
            assert_eq!(
                (0..block.row_count()).map(|r| bm.get(r)).collect::<Vec<_>>(),
                vec![false, true, false, true]
            );
        });
    }

    #[test]
    fn and_combines_bottom_up() {
        let table = table_with_rows(&[1, 2, 3, 4, 5]);
        let pred = PredicateTree::leaf(ColumnReference::new("t", 0), CompareOp::Gt, Value::Int(1))
            .and(PredicateTree::leaf(ColumnReference::new("t", 0), CompareOp::Lt, Value::Int(5)));
        table.for_each_block(|_, block| {
            let bm = pred.eval_block(block);
            assert_eq!(
                (0..block.row_count()).map(|r| bm.get(r)).collect::<Vec<_>>(),
                vec![false, true, true, true, false]
            );
        });
    }

    #[test]
    fn sma_skip_short_circuits_out_of_range_block() {
        let table = table_with_rows(&[1, 2, 3]);
        table.with_block_mut(hustle_core::BlockId(0), |b| b.rebuild_sma()).unwrap();
        let pred = PredicateTree::leaf(ColumnReference::new("t", 0), CompareOp::Gt, Value::Int(100));
        table.for_each_block(|_, block| {
            assert!(pred.block_always_false(block));
            let bm = pred.eval_block(block);
            assert!((0..block.row_count()).all(|r| !bm.get(r)));
        });
    }

    #[test]
    fn deleted_rows_never_match() {
        let table = table_with_rows(&[1, 2, 3]);
        table.delete_by_rowid(hustle_core::RowId(1)).unwrap();
        let pred = PredicateTree::leaf(ColumnReference::new("t", 0), CompareOp::Ge, Value::Int(0));
        table.for_each_block(|_, block| {
            let bm = pred.eval_block(block);
            assert!(!bm.get(1));
        });
    }
}
