//! Ties the catalog, oracle, scheduler, and operator framework into the
//! in-memory wire spec §6 names: `create_table`, `drop_table`,
//! `execute_query`, `get_plan`. Grounded on `bd/src/context.rs`'s role as
//! the one state handle every command runs against, generalized from a
//! single `.beads` directory handle to the full engine stack.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use arrow::record_batch::RecordBatch;
use hustle_catalog::{CatalogDocument, EngineConfig};
use hustle_core::{ErrorKind, HustleError, Result, Schema};
use hustle_oracle::{Oracle, OracleError, ResolvedQuery};
use hustle_query::operators::filter_join::FilterJoin;
use hustle_query::operators::hash_aggregate::HashAggregate;
use hustle_query::operators::join::Join;
use hustle_query::operators::scan::TableScan;
use hustle_query::operators::select::Select;
use hustle_query::operators::project;
use hustle_query::{ExecutionPlan, JoinKind, JoinPredicate, OperatorId};
use hustle_scheduler::{Scheduler, SchedulerHandle};
use hustle_storage::Table;

/// `execute_query`'s result: either a materialized `RecordBatch`, or the
/// shadow database's textual rows when the oracle rejected the query as
/// unsupported and the core fell back to it (spec §7).
pub enum QueryOutcome {
    Rows(RecordBatch),
    Fallback(String),
}

/// One open Hustle database: the catalog document on disk, the live
/// tables, the SQL oracle mirroring their shapes, and the scheduler that
/// runs every query's plan.
pub struct Engine {
    catalog_path: PathBuf,
    catalog: Mutex<CatalogDocument>,
    oracle: Mutex<Oracle>,
    tables: RwLock<HashMap<String, Arc<Table>>>,
    config: EngineConfig,
    scheduler: Scheduler,
    handle: SchedulerHandle,
    next_plan_id: AtomicU32,
}

impl Engine {
    pub fn open(catalog_path: &Path, config: EngineConfig) -> Result<Self> {
        let catalog = CatalogDocument::load(catalog_path)?;
        let mut oracle = Oracle::open()?;
        let mut tables = HashMap::new();
        for name in catalog.table_names().map(str::to_string).collect::<Vec<_>>() {
            let schema = catalog.table(&name).expect("name came from table_names").clone();
            oracle.create_table(&name, &schema)?;
            tables.insert(name, Arc::new(Table::new(schema, config.block_capacity_bytes)));
        }

        let mut scheduler = Scheduler::new(Some(config.resolved_workers()), config.profiling);
        let handle = scheduler
            .start()
            .map_err(|err| HustleError::with_source(ErrorKind::Internal, err.to_string(), err))?;

        Ok(Self {
            catalog_path: catalog_path.to_path_buf(),
            catalog: Mutex::new(catalog),
            oracle: Mutex::new(oracle),
            tables: RwLock::new(tables),
            config,
            scheduler,
            handle,
            next_plan_id: AtomicU32::new(0),
        })
    }

    /// spec §6 "In-memory wire": `create_table(schema, table) → bool`.
    /// Returns `Ok(false)` if the table already exists rather than an
    /// error, matching the original's boolean-return convention.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<bool> {
        let table = Arc::new(Table::new(schema.clone(), self.config.block_capacity_bytes));
        self.create_table_with_data(name, schema, table)
    }

    /// The literal spec §6 wire signature: registers a table that may
    /// already carry rows (the bulk-load path scenarios (3)-(6) need,
    /// where the caller builds the table before it is queryable).
    pub fn create_table_with_data(&self, name: &str, schema: Schema, table: Arc<Table>) -> Result<bool> {
        {
            let mut catalog = self.catalog.lock();
            if catalog.add_table(name, schema.clone()).is_err() {
                return Ok(false);
            }
            catalog.save(&self.catalog_path)?;
        }
        self.oracle.lock().create_table(name, &schema)?;
        self.tables.write().insert(name.to_string(), table);
        Ok(true)
    }

    pub fn drop_table(&self, name: &str) -> Result<bool> {
        {
            let mut catalog = self.catalog.lock();
            if catalog.drop_table(name).is_err() {
                return Ok(false);
            }
            catalog.save(&self.catalog_path)?;
        }
        self.oracle.lock().drop_table(name)?;
        self.tables.write().remove(name);
        Ok(true)
    }

    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// spec §6: `get_plan(sql) -> textual EXPLAIN output`.
    pub fn get_plan(&self, sql: &str) -> Result<String> {
        Ok(self.oracle.lock().get_plan(sql)?)
    }

    /// spec §6: `execute_query(sql) -> result_table`. Resolves `sql`
    /// against the oracle, builds an [`ExecutionPlan`], fires it at the
    /// scheduler, and materializes the terminal result. A construct the
    /// resolver rejects as unsupported falls back to the shadow database
    /// and returns its textual rows verbatim (spec §7 "Unsupported
    /// features cause the core to fall back to the oracle execution
    /// path").
    pub fn execute_query(&self, sql: &str) -> Result<QueryOutcome> {
        let resolved = match self.oracle.lock().resolve(sql) {
            Ok(resolved) => resolved,
            Err(OracleError::Unsupported(_)) => return self.fallback_query(sql),
            Err(err) => return Err(err.into()),
        };

        let tables = self.tables.read();
        let major_id = self.next_plan_id.fetch_add(1, Ordering::Relaxed);
        let plan_result = build_plan(&resolved, &tables, &self.config, major_id);
        drop(tables);
        let (plan, table_order) = plan_result?;

        let plan_handle = plan.fire(&self.handle);
        let result = plan_handle.wait();
        let batch = project::materialize(&result, resolved.projected.as_slice(), &table_order)?;
        Ok(QueryOutcome::Rows(batch))
    }

    fn fallback_query(&self, sql: &str) -> Result<QueryOutcome> {
        let text = self.oracle.lock().query_fallback(sql)?;
        Ok(QueryOutcome::Fallback(text))
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.scheduler
            .join()
            .map_err(|err| HustleError::with_source(ErrorKind::Internal, err.to_string(), err))
    }
}

/// Builds an [`ExecutionPlan`] from a resolved query: scan + select per
/// table, an optional star join across all of them, then an optional
/// aggregate. Returns the plan and the table order its terminal operator's
/// result binds (needed by [`project::materialize`]).
fn build_plan(
    resolved: &ResolvedQuery,
    tables: &HashMap<String, Arc<Table>>,
    config: &EngineConfig,
    major_id: u32,
) -> Result<(ExecutionPlan, Vec<String>)> {
    let mut plan = ExecutionPlan::new(major_id);
    let mut scanned: HashMap<String, OperatorId> = HashMap::new();

    for name in &resolved.tables {
        let table = tables
            .get(name)
            .ok_or_else(|| HustleError::schema_mismatch(format!("unknown table `{name}`")))?
            .clone();
        let scan_id = plan.add_operator(TableScan::new(table));
        let node_id = match resolved.predicates.get(name) {
            Some(predicate) => {
                let select_id = plan.add_operator(Select::new(predicate.clone()));
                plan.create_link(scan_id, select_id);
                select_id
            }
            None => scan_id,
        };
        scanned.insert(name.clone(), node_id);
    }

    let (joined_id, table_order) = if resolved.joins.is_empty() {
        let only = resolved
            .tables
            .first()
            .ok_or_else(|| HustleError::plan_error("query resolved to no tables"))?;
        (scanned[only], vec![only.clone()])
    } else if use_two_way_join(resolved) {
        build_two_way_join(resolved, &scanned, &mut plan)?
    } else {
        let fact = fact_table(&resolved.tables, &resolved.joins);
        let mut dim_predicates = Vec::with_capacity(resolved.joins.len());
        let mut dim_names = Vec::with_capacity(resolved.joins.len());
        for join in &resolved.joins {
            let (dim_name, predicate) = if join.left.table == fact {
                (join.right.table.clone(), JoinPredicate::new(join.left.clone(), join.right.clone()))
            } else {
                (join.left.table.clone(), JoinPredicate::new(join.right.clone(), join.left.clone()))
            };
            dim_predicates.push(predicate);
            dim_names.push(dim_name);
        }

        let fact_id = *scanned
            .get(&fact)
            .ok_or_else(|| HustleError::plan_error(format!("fact table `{fact}` not scanned")))?;
        let join_id = plan.add_operator(FilterJoin::new(dim_predicates, config.bloom_fp_target));
        plan.create_link(fact_id, join_id);
        for dim_name in &dim_names {
            let dim_id = *scanned
                .get(dim_name)
                .ok_or_else(|| HustleError::plan_error(format!("dimension table `{dim_name}` not scanned")))?;
            plan.create_link(dim_id, join_id);
        }

        let mut order = vec![fact];
        order.extend(dim_names);
        (join_id, order)
    };

    let terminal_id = if let Some(aggregate) = &resolved.aggregate {
        let agg_id = plan.add_operator(HashAggregate::new(
            resolved.group_by.clone(),
            vec![aggregate.clone()],
            resolved.order_by.clone(),
            table_order.clone(),
            config.resolved_workers(),
        ));
        plan.create_link(joined_id, agg_id);
        agg_id
    } else {
        joined_id
    };

    plan.set_terminal(terminal_id);
    plan.set_projected_refs(resolved.projected.clone());
    Ok((plan, table_order))
}

/// The fact table in a star join is the one every join predicate touches;
/// dimensions appear exactly once each (spec §4.7). Ties (e.g. a plain
/// two-table join, where both sides touch the lone predicate once) are
/// broken by position in `resolved.tables`' FROM-clause order rather than
/// `HashMap` iteration order, which `std::HashMap`'s randomized hasher
/// would otherwise make the plan's fact/dimension orientation nondeterministic
/// across runs.
fn fact_table(resolved_tables: &[String], joins: &[JoinPredicate]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for join in joins {
        *counts.entry(join.left.table.as_str()).or_default() += 1;
        *counts.entry(join.right.table.as_str()).or_default() += 1;
    }
    resolved_tables
        .iter()
        .find(|name| counts.get(name.as_str()).copied().unwrap_or(0) == joins.len())
        .cloned()
        .or_else(|| {
            resolved_tables
                .iter()
                .max_by_key(|name| counts.get(name.as_str()).copied().unwrap_or(0))
                .cloned()
        })
        .unwrap_or_default()
}

/// Whether this query's joins need the two-way [`Join`] operator instead of
/// the star-schema [`FilterJoin`]: either because a side must be preserved
/// under outer-join semantics, or because two predicates name the exact
/// same pair of tables (a composite-key equality `FilterJoin` isn't shaped
/// for -- its predicates each name a distinct dimension, spec §8 scenario
/// (1)'s `NATURAL JOIN` on two shared columns).
fn use_two_way_join(resolved: &ResolvedQuery) -> bool {
    !matches!(resolved.join_kind, JoinKind::Inner) || has_repeated_table_pair(&resolved.joins)
}

fn has_repeated_table_pair(joins: &[JoinPredicate]) -> bool {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for join in joins {
        let mut pair = [join.left.table.clone(), join.right.table.clone()];
        pair.sort();
        if !seen.insert((pair[0].clone(), pair[1].clone())) {
            return true;
        }
    }
    false
}

/// Builds the LEFT/RIGHT JOIN and composite-key NATURAL JOIN path: a single
/// [`Join`] node wired directly between the two scanned tables, bypassing
/// the star-schema [`FilterJoin`] entirely.
fn build_two_way_join(
    resolved: &ResolvedQuery,
    scanned: &HashMap<String, OperatorId>,
    plan: &mut ExecutionPlan,
) -> Result<(OperatorId, Vec<String>)> {
    if resolved.tables.len() != 2 {
        return Err(HustleError::plan_error(
            "LEFT/RIGHT JOIN and composite-key joins are only supported between two tables",
        ));
    }

    let (left_name, right_name) = match &resolved.join_kind {
        JoinKind::Left { preserved } => {
            let other = resolved
                .tables
                .iter()
                .find(|t| *t != preserved)
                .cloned()
                .ok_or_else(|| HustleError::plan_error("left join needs two distinct tables"))?;
            (preserved.clone(), other)
        }
        JoinKind::Inner => (resolved.tables[0].clone(), resolved.tables[1].clone()),
    };

    let predicates: Vec<JoinPredicate> = resolved
        .joins
        .iter()
        .map(|p| {
            if p.left.table == left_name {
                JoinPredicate::new(p.left.clone(), p.right.clone())
            } else {
                JoinPredicate::new(p.right.clone(), p.left.clone())
            }
        })
        .collect();

    let left_id = *scanned
        .get(&left_name)
        .ok_or_else(|| HustleError::plan_error(format!("table `{left_name}` not scanned")))?;
    let right_id = *scanned
        .get(&right_name)
        .ok_or_else(|| HustleError::plan_error(format!("table `{right_name}` not scanned")))?;

    let outer = matches!(resolved.join_kind, JoinKind::Left { .. });
    let join_id = plan.add_operator(Join::new_multi(predicates, 0, outer));
    plan.create_link(left_id, join_id);
    plan.create_link(right_id, join_id);

    Ok((join_id, vec![left_name, right_name]))
}
