//! Resolves a `SELECT` string into the reference bundle spec §6 names
//! (predicate map, join predicates, group-by/order-by/projected references,
//! zero-or-one aggregate), by walking a `sqlparser` AST. The real Hustle
//! resolver (`original_source/src/resolver/Resolver.cpp`) walks SQLite's
//! own internal parse tree, which `rusqlite`'s bindings don't expose; this
//! walks `sqlparser`'s AST instead and follows the same ordering the
//! original documents -- table references, then select predicates pushed
//! onto them, then join predicates, then group-by/order-by/projection.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, Join, JoinConstraint, JoinOperator, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use hustle_core::{CompareOp, Value};
use hustle_query::{
    AggExpr, AggKernel, AggregateRef, ArithOp, ColumnReference, GroupKey, JoinKind, JoinPredicate, OrderByReference,
    PredicateTree, ProjectedReference,
};

use crate::error::{OracleError, Result};

/// The column names a table declares, in schema order -- everything the
/// resolver needs to turn a bare identifier into a `(table, index)` pair.
/// Callers build this from whatever `hustle-catalog` document is open.
pub struct TableShape {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableShape {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self { name: name.into(), columns }
    }
}

/// The fully resolved bundle, ready for an `ExecutionPlan` builder to turn
/// into `TableScan`/`Select`/`Join`/`HashAggregate` nodes.
#[derive(Debug, Default)]
pub struct ResolvedQuery {
    pub tables: Vec<String>,
    pub predicates: HashMap<String, PredicateTree>,
    pub joins: Vec<JoinPredicate>,
    pub join_kind: JoinKind,
    pub group_by: Vec<GroupKey>,
    pub order_by: Vec<OrderByReference>,
    pub projected: Vec<ProjectedReference>,
    pub aggregate: Option<AggregateRef>,
}

pub fn resolve_select(sql: &str, schemas: &[TableShape]) -> Result<ResolvedQuery> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql).map_err(|e| OracleError::Parse(e.to_string()))?;
    if statements.len() != 1 {
        return Err(OracleError::unsupported("expected exactly one statement"));
    }
    let query = match statements.remove(0) {
        Statement::Query(q) => *q,
        _ => return Err(OracleError::unsupported("only SELECT statements are resolved")),
    };
    let select = match *query.body {
        SetExpr::Select(s) => *s,
        _ => return Err(OracleError::unsupported("only a flat SELECT body is resolved (no UNION/VALUES)")),
    };

    let mut lookup = TableLookup::new(schemas);
    let tables = collect_tables(&select.from, &mut lookup)?;

    let mut predicates: HashMap<String, PredicateTree> = HashMap::new();
    let mut joins = Vec::new();
    if let Some(selection) = &select.selection {
        resolve_conjunct(selection, &lookup, &mut predicates, &mut joins)?;
    }

    let mut join_kind = JoinKind::Inner;
    let mut natural_dedup: HashSet<(String, usize)> = HashSet::new();
    for twj in &select.from {
        let mut left_name = factor_canonical(&twj.relation)?;
        for join in &twj.joins {
            let right_name = factor_canonical(&join.relation)?;
            let (side, on) = join_shape(join)?;
            match side {
                JoinSide::Left => join_kind = JoinKind::Left { preserved: left_name.clone() },
                JoinSide::Right => join_kind = JoinKind::Left { preserved: right_name.clone() },
                JoinSide::Inner => {}
            }
            match on {
                Some(expr) => resolve_conjunct(expr, &lookup, &mut predicates, &mut joins)?,
                None => synthesize_natural_join(&left_name, &right_name, &lookup, &mut joins, &mut natural_dedup)?,
            }
            left_name = right_name;
        }
    }

    let group_by = select
        .group_by
        .iter()
        .map(|e| resolve_group_key(e, &lookup))
        .collect::<Result<Vec<_>>>()?;

    let order_by = query
        .order_by
        .iter()
        .map(|o| {
            let key = resolve_group_key(&o.expr, &lookup)?;
            let asc = o.asc.unwrap_or(true);
            Ok(match (asc, key.modulo) {
                (true, None) => OrderByReference::asc(key.column),
                (false, None) => OrderByReference::desc(key.column),
                (true, Some(m)) => OrderByReference::asc_modulo(key.column, m),
                (false, Some(m)) => OrderByReference::desc_modulo(key.column, m),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (projected, aggregate) = resolve_projection(&select, &tables, &lookup, &natural_dedup)?;

    Ok(ResolvedQuery { tables, predicates, joins, join_kind, group_by, order_by, projected, aggregate })
}

/// Which side of an outer join keeps every row; `Inner` covers both a plain
/// `JOIN ... ON` and `NATURAL JOIN`, which the caller treats identically
/// once the ON expression (or its synthesized equivalent) is in hand.
enum JoinSide {
    Inner,
    Left,
    Right,
}

/// Classifies one `JOIN` clause into its outer-join side and (when present)
/// its `ON` expression. `NATURAL` returns `None` for the expression -- the
/// caller synthesizes the equality predicates from the two tables' shared
/// column names. Only full outer joins remain an explicit Non-goal (spec
/// §1); `LEFT`/`RIGHT` and `NATURAL` are in scope (spec §8 scenarios (1)
/// and (2)).
fn join_shape(join: &Join) -> Result<(JoinSide, Option<&Expr>)> {
    match &join.join_operator {
        JoinOperator::Inner(JoinConstraint::On(expr)) => Ok((JoinSide::Inner, Some(expr))),
        JoinOperator::Inner(JoinConstraint::Natural) => Ok((JoinSide::Inner, None)),
        JoinOperator::LeftOuter(JoinConstraint::On(expr)) => Ok((JoinSide::Left, Some(expr))),
        JoinOperator::RightOuter(JoinConstraint::On(expr)) => Ok((JoinSide::Right, Some(expr))),
        JoinOperator::FullOuter(_) => Err(OracleError::unsupported("FULL OUTER JOIN is not supported")),
        JoinOperator::LeftOuter(JoinConstraint::Natural) | JoinOperator::RightOuter(JoinConstraint::Natural) => {
            Err(OracleError::unsupported("NATURAL OUTER JOIN is not supported"))
        }
        JoinOperator::CrossJoin => Err(OracleError::unsupported("CROSS JOIN is not supported")),
        _ => Err(OracleError::unsupported("unsupported join type")),
    }
}

/// The bare table name of a `FROM`/`JOIN` factor, for tracking which table
/// precedes a join (needed to name the preserved side of an outer join and
/// the two tables a `NATURAL JOIN` matches columns between).
fn factor_canonical(factor: &TableFactor) -> Result<String> {
    match factor {
        TableFactor::Table { name, .. } => Ok(name.0.last().ok_or_else(|| OracleError::plan("empty table name"))?.value.clone()),
        _ => Err(OracleError::unsupported("only plain table references are supported in FROM")),
    }
}

/// Resolves `NATURAL JOIN` into one `JoinPredicate` per column name the two
/// tables share, and records each shared right-hand column in `dedup` so a
/// later `SELECT *` prints each shared column once (spec §8 scenario (1)).
fn synthesize_natural_join(
    left: &str,
    right: &str,
    lookup: &TableLookup,
    joins: &mut Vec<JoinPredicate>,
    dedup: &mut HashSet<(String, usize)>,
) -> Result<()> {
    let left_shape = lookup.shape(left)?;
    let right_shape = lookup.shape(right)?;
    let mut matched = false;
    for (right_idx, name) in right_shape.columns.iter().enumerate() {
        if let Some(left_idx) = left_shape.columns.iter().position(|c| c == name) {
            joins.push(JoinPredicate::new(
                ColumnReference::new(left.to_string(), left_idx),
                ColumnReference::new(right.to_string(), right_idx),
            ));
            dedup.insert((right.to_string(), right_idx));
            matched = true;
        }
    }
    if !matched {
        return Err(OracleError::unsupported("NATURAL JOIN found no common columns between the two tables"));
    }
    Ok(())
}

fn resolve_projection(
    select: &Select,
    tables: &[String],
    lookup: &TableLookup,
    natural_dedup: &HashSet<(String, usize)>,
) -> Result<(Vec<ProjectedReference>, Option<AggregateRef>)> {
    let mut projected = Vec::new();
    let mut aggregate = None;
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => match try_resolve_aggregate(expr, lookup)? {
                Some(agg) => aggregate = Some(agg),
                None => projected.push(ProjectedReference::new(resolve_column_expr(expr, lookup)?)),
            },
            SelectItem::ExprWithAlias { expr, alias } => match try_resolve_aggregate(expr, lookup)? {
                Some(agg) => aggregate = Some(agg.aliased(alias.value.clone())),
                None => projected.push(ProjectedReference::aliased(resolve_column_expr(expr, lookup)?, alias.value.clone())),
            },
            SelectItem::Wildcard(_) => {
                for table in tables {
                    push_all_columns(table, lookup, natural_dedup, &mut projected)?;
                }
            }
            SelectItem::QualifiedWildcard(name, _) => {
                let table_ref = name.0.last().ok_or_else(|| OracleError::plan("empty qualified wildcard"))?;
                let table = lookup.canonical(&table_ref.value)?;
                push_all_columns(&table, lookup, natural_dedup, &mut projected)?;
            }
        }
    }
    Ok((projected, aggregate))
}

fn push_all_columns(
    table: &str,
    lookup: &TableLookup,
    natural_dedup: &HashSet<(String, usize)>,
    out: &mut Vec<ProjectedReference>,
) -> Result<()> {
    let shape = lookup.shape(table)?;
    for idx in 0..shape.columns.len() {
        if natural_dedup.contains(&(table.to_string(), idx)) {
            continue;
        }
        out.push(ProjectedReference::new(ColumnReference::new(table.to_string(), idx)));
    }
    Ok(())
}

fn collect_tables(from: &[TableWithJoins], lookup: &mut TableLookup) -> Result<Vec<String>> {
    let mut tables = Vec::new();
    for twj in from {
        register_factor(&twj.relation, lookup, &mut tables)?;
        for join in &twj.joins {
            register_factor(&join.relation, lookup, &mut tables)?;
        }
    }
    Ok(tables)
}

fn register_factor(factor: &TableFactor, lookup: &mut TableLookup, tables: &mut Vec<String>) -> Result<()> {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let canonical = name.0.last().ok_or_else(|| OracleError::plan("empty table name"))?.value.clone();
            lookup.shape(&canonical)?;
            lookup.register(&canonical, alias.as_ref().map(|a| a.name.value.as_str()));
            tables.push(canonical);
            Ok(())
        }
        _ => Err(OracleError::unsupported("only plain table references are supported in FROM")),
    }
}

/// Either a join predicate between two tables, or a predicate pinned to a
/// single table (pushed into that table's `PredicateTree`).
enum Resolved {
    Join(JoinPredicate),
    Table(String, PredicateTree),
}

fn resolve_conjunct(
    expr: &Expr,
    lookup: &TableLookup,
    predicates: &mut HashMap<String, PredicateTree>,
    joins: &mut Vec<JoinPredicate>,
) -> Result<()> {
    if let Expr::BinaryOp { left, op: BinaryOperator::And, right } = expr {
        resolve_conjunct(left, lookup, predicates, joins)?;
        resolve_conjunct(right, lookup, predicates, joins)?;
        return Ok(());
    }
    match resolve_leaf(expr, lookup)? {
        Resolved::Join(j) => joins.push(j),
        Resolved::Table(table, tree) => match predicates.remove(&table) {
            Some(existing) => {
                predicates.insert(table, existing.and(tree));
            }
            None => {
                predicates.insert(table, tree);
            }
        },
    }
    Ok(())
}

fn resolve_leaf(expr: &Expr, lookup: &TableLookup) -> Result<Resolved> {
    match expr {
        Expr::BinaryOp { left, op: BinaryOperator::Or, right } => {
            match (resolve_leaf(left, lookup)?, resolve_leaf(right, lookup)?) {
                (Resolved::Table(lt, lp), Resolved::Table(rt, rp)) if lt == rt => Ok(Resolved::Table(lt, lp.or(rp))),
                _ => Err(OracleError::unsupported("OR is only supported between two predicates on the same table")),
            }
        }
        Expr::BinaryOp { left, op, right } => {
            let compare_op = binary_to_compare(op)?;
            if let (Ok(lc), Ok(rc)) = (resolve_column_expr(left, lookup), resolve_column_expr(right, lookup)) {
                if lc.table != rc.table {
                    if compare_op != CompareOp::Eq {
                        return Err(OracleError::unsupported("only equijoin predicates are supported across tables"));
                    }
                    return Ok(Resolved::Join(JoinPredicate::new(lc, rc)));
                }
            }
            if let Ok(column) = resolve_column_expr(left, lookup) {
                let value = resolve_literal(right)?;
                let table = column.table.clone();
                return Ok(Resolved::Table(table, PredicateTree::leaf(column, compare_op, value)));
            }
            if let Ok(column) = resolve_column_expr(right, lookup) {
                let value = resolve_literal(left)?;
                let table = column.table.clone();
                return Ok(Resolved::Table(table, PredicateTree::leaf(column, flip(compare_op), value)));
            }
            Err(OracleError::plan("comparison has no resolvable column"))
        }
        Expr::Between { expr, negated, low, high } => {
            if *negated {
                return Err(OracleError::unsupported("NOT BETWEEN is not supported"));
            }
            let column = resolve_column_expr(expr, lookup)?;
            let lo = resolve_literal(low)?;
            let hi = resolve_literal(high)?;
            let table = column.table.clone();
            Ok(Resolved::Table(table, PredicateTree::between(column, lo, hi)))
        }
        _ => Err(OracleError::unsupported(format!("unsupported predicate expression: {expr}"))),
    }
}

fn binary_to_compare(op: &BinaryOperator) -> Result<CompareOp> {
    Ok(match op {
        BinaryOperator::Eq => CompareOp::Eq,
        BinaryOperator::NotEq => CompareOp::Ne,
        BinaryOperator::Lt => CompareOp::Lt,
        BinaryOperator::LtEq => CompareOp::Le,
        BinaryOperator::Gt => CompareOp::Gt,
        BinaryOperator::GtEq => CompareOp::Ge,
        other => return Err(OracleError::unsupported(format!("unsupported comparison operator: {other:?}"))),
    })
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Le => CompareOp::Ge,
        CompareOp::Ge => CompareOp::Le,
        other => other,
    }
}

fn resolve_literal(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Value(SqlValue::Number(n, _)) => {
            n.parse::<i64>().map(Value::Int).map_err(|_| OracleError::unsupported(format!("non-integer literal `{n}`")))
        }
        Expr::Value(SqlValue::SingleQuotedString(s)) => Ok(Value::Str(s.clone())),
        Expr::UnaryOp { op: UnaryOperator::Minus, expr } => match resolve_literal(expr)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            other => Err(OracleError::unsupported(format!("cannot negate {other:?}"))),
        },
        _ => Err(OracleError::unsupported("only integer and string literals are supported")),
    }
}

fn resolve_column_expr(expr: &Expr, lookup: &TableLookup) -> Result<ColumnReference> {
    match expr {
        Expr::Identifier(ident) => lookup.resolve_unqualified(&ident.value),
        Expr::CompoundIdentifier(parts) if parts.len() == 2 => lookup.resolve_qualified(&parts[0].value, &parts[1].value),
        _ => Err(OracleError::unsupported(format!("unsupported column expression: {expr}"))),
    }
}

/// A GROUP BY / ORDER BY key: either a plain column, or `column % n` (spec
/// §8 scenario (5): `GROUP BY x % 7`).
fn resolve_group_key(expr: &Expr, lookup: &TableLookup) -> Result<GroupKey> {
    match expr {
        Expr::BinaryOp { left, op: BinaryOperator::Modulo, right } => {
            let column = resolve_column_expr(left, lookup)?;
            let modulo = match resolve_literal(right)? {
                Value::Int(n) => n,
                other => return Err(OracleError::unsupported(format!("group-by modulus must be an integer literal, got {other:?}"))),
            };
            Ok(GroupKey::modulo(column, modulo))
        }
        _ => Ok(GroupKey::plain(resolve_column_expr(expr, lookup)?)),
    }
}

fn try_resolve_aggregate(expr: &Expr, lookup: &TableLookup) -> Result<Option<AggregateRef>> {
    let Expr::Function(func) = expr else { return Ok(None) };
    let kernel = match aggregate_kernel(func) {
        Some(k) => k,
        None => return Ok(None),
    };
    let arg = single_function_arg(func)?;
    if let Ok(column) = resolve_column_expr(arg, lookup) {
        return Ok(Some(AggregateRef::column(kernel, column)));
    }
    if let Expr::BinaryOp { left, op, right } = arg {
        let arith_op = match op {
            BinaryOperator::Plus => ArithOp::Add,
            BinaryOperator::Minus => ArithOp::Sub,
            BinaryOperator::Multiply => ArithOp::Mul,
            BinaryOperator::Divide => ArithOp::Div,
            other => return Err(OracleError::unsupported(format!("unsupported aggregate expression operator: {other:?}"))),
        };
        let left = resolve_column_expr(left, lookup)?;
        let right = resolve_column_expr(right, lookup)?;
        return Ok(Some(AggregateRef::arithmetic(kernel, arith_op, left, right)));
    }
    Err(OracleError::unsupported("aggregate argument must be a column or a two-column arithmetic expression"))
}

fn aggregate_kernel(func: &Function) -> Option<AggKernel> {
    let name = func.name.0.last()?.value.to_uppercase();
    match name.as_str() {
        "SUM" => Some(AggKernel::Sum),
        "COUNT" => Some(AggKernel::Count),
        "AVG" | "MEAN" => Some(AggKernel::Mean),
        _ => None,
    }
}

fn single_function_arg(func: &Function) -> Result<&Expr> {
    match func.args.as_slice() {
        [FunctionArg::Unnamed(FunctionArgExpr::Expr(e))] => Ok(e),
        [FunctionArg::Unnamed(FunctionArgExpr::Wildcard)] => Err(OracleError::unsupported("COUNT(*) is not supported; name a column")),
        _ => Err(OracleError::unsupported("an aggregate must take exactly one argument")),
    }
}

struct TableLookup<'a> {
    shapes: &'a [TableShape],
    aliases: HashMap<String, String>,
}

impl<'a> TableLookup<'a> {
    fn new(shapes: &'a [TableShape]) -> Self {
        Self { shapes, aliases: HashMap::new() }
    }

    fn register(&mut self, canonical: &str, alias: Option<&str>) {
        self.aliases.insert(canonical.to_string(), canonical.to_string());
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_string(), canonical.to_string());
        }
    }

    fn canonical(&self, alias_or_name: &str) -> Result<String> {
        self.aliases.get(alias_or_name).cloned().ok_or_else(|| OracleError::plan(format!("unknown table `{alias_or_name}`")))
    }

    fn shape(&self, table: &str) -> Result<&TableShape> {
        self.shapes.iter().find(|s| s.name == table).ok_or_else(|| OracleError::plan(format!("unknown table `{table}`")))
    }

    fn resolve_qualified(&self, alias_or_name: &str, column: &str) -> Result<ColumnReference> {
        let canonical = self.canonical(alias_or_name)?;
        let shape = self.shape(&canonical)?;
        let idx = shape
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| OracleError::plan(format!("unknown column `{column}` on `{canonical}`")))?;
        Ok(ColumnReference::new(canonical, idx))
    }

    fn resolve_unqualified(&self, column: &str) -> Result<ColumnReference> {
        let mut hit: Option<ColumnReference> = None;
        let seen: HashSet<&str> = self.aliases.values().map(|s| s.as_str()).collect();
        for table in seen {
            let shape = self.shape(table)?;
            if let Some(idx) = shape.columns.iter().position(|c| c == column) {
                if hit.is_some() {
                    return Err(OracleError::plan(format!("ambiguous column `{column}`")));
                }
                hit = Some(ColumnReference::new(table.to_string(), idx));
            }
        }
        hit.ok_or_else(|| OracleError::plan(format!("unknown column `{column}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssb_shapes() -> Vec<TableShape> {
        vec![
            TableShape::new("lineorder", vec!["lo_orderkey", "lo_orderdate", "lo_quantity", "lo_extendedprice", "lo_discount"].into_iter().map(String::from).collect()),
            TableShape::new("ddate", vec!["d_datekey", "d_year"].into_iter().map(String::from).collect()),
        ]
    }

    #[test]
    fn resolves_ssb_scenario_query() {
        let sql = "SELECT sum(lo_extendedprice*lo_discount) FROM lineorder, ddate \
                   WHERE d_datekey = lo_orderdate AND d_year = 1993 \
                   AND lo_discount BETWEEN 0 AND 3 AND lo_quantity < 25";
        let resolved = resolve_select(sql, &ssb_shapes()).unwrap();

        assert_eq!(resolved.tables, vec!["lineorder", "ddate"]);
        assert_eq!(resolved.joins, vec![JoinPredicate::new(ColumnReference::new("ddate", 0), ColumnReference::new("lineorder", 1))]);
        assert!(resolved.predicates.contains_key("ddate"));
        assert!(resolved.predicates.contains_key("lineorder"));
        let agg = resolved.aggregate.expect("query has one aggregate");
        assert_eq!(agg.kernel, AggKernel::Sum);
        assert!(matches!(agg.expr, AggExpr::Arithmetic { op: ArithOp::Mul, .. }));
    }

    #[test]
    fn rejects_unsupported_or_across_tables() {
        let sql = "SELECT * FROM lineorder, ddate WHERE lineorder.lo_orderdate = 1 OR ddate.d_year = 1";
        let err = resolve_select(sql, &ssb_shapes()).unwrap_err();
        assert!(matches!(err, OracleError::Unsupported(_)));
    }

    #[test]
    fn ambiguous_unqualified_column_is_a_plan_error() {
        let shapes = vec![
            TableShape::new("t", vec!["x".to_string()]),
            TableShape::new("t2", vec!["x".to_string()]),
        ];
        let err = resolve_select("SELECT x FROM t, t2", &shapes).unwrap_err();
        assert!(matches!(err, OracleError::Plan(_)));
    }

    fn tt2_shapes() -> Vec<TableShape> {
        vec![
            TableShape::new("t", vec!["a", "b", "c"].into_iter().map(String::from).collect()),
            TableShape::new("t2", vec!["b", "c", "d"].into_iter().map(String::from).collect()),
        ]
    }

    #[test]
    fn natural_join_matches_shared_columns_and_dedups_wildcard() {
        let resolved = resolve_select("SELECT * FROM t NATURAL JOIN t2", &tt2_shapes()).unwrap();
        assert_eq!(resolved.joins.len(), 2, "t and t2 share two columns, b and c");
        assert!(resolved.joins.contains(&JoinPredicate::new(ColumnReference::new("t", 1), ColumnReference::new("t2", 0))));
        assert!(resolved.joins.contains(&JoinPredicate::new(ColumnReference::new("t", 2), ColumnReference::new("t2", 1))));
        assert!(matches!(resolved.join_kind, JoinKind::Inner));
        // a, b, c from t, then only d from t2 (t2.b/t2.c are the shared columns).
        assert_eq!(
            resolved.projected,
            vec![
                ProjectedReference::new(ColumnReference::new("t", 0)),
                ProjectedReference::new(ColumnReference::new("t", 1)),
                ProjectedReference::new(ColumnReference::new("t", 2)),
                ProjectedReference::new(ColumnReference::new("t2", 2)),
            ]
        );
    }

    #[test]
    fn left_join_is_resolved_not_rejected() {
        let resolved = resolve_select("SELECT * FROM t LEFT JOIN t2 ON t.a = t2.d WHERE t.a > 1", &tt2_shapes()).unwrap();
        assert_eq!(resolved.joins, vec![JoinPredicate::new(ColumnReference::new("t", 0), ColumnReference::new("t2", 2))]);
        assert_eq!(resolved.join_kind, JoinKind::Left { preserved: "t".to_string() });
    }

    #[test]
    fn full_outer_join_remains_unsupported() {
        let err = resolve_select("SELECT * FROM t FULL OUTER JOIN t2 ON t.a = t2.d", &tt2_shapes()).unwrap_err();
        assert!(matches!(err, OracleError::Unsupported(_)));
    }

    #[test]
    fn group_by_modulo_resolves_an_arithmetic_key() {
        let shapes = vec![TableShape::new("t", vec!["x".to_string()])];
        let resolved = resolve_select("SELECT sum(x) FROM t GROUP BY x % 7 ORDER BY x % 7", &shapes).unwrap();
        assert_eq!(resolved.group_by, vec![GroupKey::modulo(ColumnReference::new("t", 0), 7)]);
        assert_eq!(resolved.order_by, vec![OrderByReference::asc_modulo(ColumnReference::new("t", 0), 7)]);
    }
}
