//! References into a table's schema used throughout the operator
//! framework: predicate leaves, group-by, order-by, and the projection
//! list (spec §6 "Parser oracle").

use hustle_core::TableName;

/// A single resolved column, named by table and column index (the
/// resolver already validated the name against the schema; by the time a
/// `ColumnReference` reaches an operator it is purely positional).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnReference {
    pub table: TableName,
    pub index: usize,
}

impl ColumnReference {
    pub fn new(table: impl Into<TableName>, index: usize) -> Self {
        Self {
            table: table.into(),
            index,
        }
    }
}

/// A GROUP BY key: a column, optionally reduced by `% modulo` (spec §8
/// scenario (5): `GROUP BY x % 7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    pub column: ColumnReference,
    pub modulo: Option<i64>,
}

impl GroupKey {
    pub fn plain(column: ColumnReference) -> Self {
        Self { column, modulo: None }
    }

    pub fn modulo(column: ColumnReference, modulo: i64) -> Self {
        Self {
            column,
            modulo: Some(modulo),
        }
    }
}

/// An order-by entry: a column plus direction, optionally reduced by the
/// same `% modulo` as a matching [`GroupKey`] (ORDER BY x%7 must sort on
/// the group key's value, not the raw column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByReference {
    pub column: ColumnReference,
    pub modulo: Option<i64>,
    pub descending: bool,
}

impl OrderByReference {
    pub fn asc(column: ColumnReference) -> Self {
        Self {
            column,
            modulo: None,
            descending: false,
        }
    }

    pub fn desc(column: ColumnReference) -> Self {
        Self {
            column,
            modulo: None,
            descending: true,
        }
    }

    pub fn asc_modulo(column: ColumnReference, modulo: i64) -> Self {
        Self {
            column,
            modulo: Some(modulo),
            descending: false,
        }
    }

    pub fn desc_modulo(column: ColumnReference, modulo: i64) -> Self {
        Self {
            column,
            modulo: Some(modulo),
            descending: true,
        }
    }
}

/// A projected output column, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedReference {
    pub column: ColumnReference,
    pub alias: Option<String>,
}

impl ProjectedReference {
    pub fn new(column: ColumnReference) -> Self {
        Self {
            column,
            alias: None,
        }
    }

    pub fn aliased(column: ColumnReference, alias: impl Into<String>) -> Self {
        Self {
            column,
            alias: Some(alias.into()),
        }
    }
}

/// An equijoin predicate between two tables' columns (spec §4.7: "a set of
/// join predicates forming a graph").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPredicate {
    pub left: ColumnReference,
    pub right: ColumnReference,
}

impl JoinPredicate {
    pub fn new(left: ColumnReference, right: ColumnReference) -> Self {
        Self { left, right }
    }
}

/// How a query's joins combine once resolved: a plain inner equijoin, or
/// an outer join preserving one named side and NULL-padding its partner
/// on a miss (spec §8 scenario (2); full outer joins remain a Non-goal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left { preserved: TableName },
}

impl Default for JoinKind {
    fn default() -> Self {
        JoinKind::Inner
    }
}

/// An aggregate kernel (spec §4.8: "SUM, COUNT, MEAN").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKernel {
    Sum,
    Count,
    Mean,
}

/// A binary arithmetic operator for a two-column aggregate expression
/// (spec §6 "a two-child arithmetic expression over columns").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// What an [`AggregateRef`] aggregates: either a single column, or a
/// simple binary arithmetic expression over two columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggExpr {
    Column(ColumnReference),
    Arithmetic {
        op: ArithOp,
        left: ColumnReference,
        right: ColumnReference,
    },
}

/// One aggregate to compute per group (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRef {
    pub kernel: AggKernel,
    pub expr: AggExpr,
    pub alias: Option<String>,
}

impl AggregateRef {
    pub fn column(kernel: AggKernel, column: ColumnReference) -> Self {
        Self {
            kernel,
            expr: AggExpr::Column(column),
            alias: None,
        }
    }

    pub fn arithmetic(kernel: AggKernel, op: ArithOp, left: ColumnReference, right: ColumnReference) -> Self {
        Self {
            kernel,
            expr: AggExpr::Arithmetic { op, left, right },
            alias: None,
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}
