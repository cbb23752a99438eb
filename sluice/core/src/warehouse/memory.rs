use async_trait::async_trait;
use datafusion::{
    arrow::{datatypes::SchemaRef, record_batch::RecordBatch},
    catalog::{MemorySchemaProvider, SchemaProvider, TableProvider},
    common::{tree_node::TreeNodeRecursion, TableReference},
    datasource::MemTable,
    error::DataFusionError,
    execution::context::SessionContext,
    logical_expr::{LogicalPlan, TableType},
};
use sluice_formats::Dataset;
use sluice_schemas::WriteMode;
use std::{collections::HashSet, fmt, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Warehouse, WarehouseError};
use crate::sql::SqlScript;

/// Warehouse keeping every table in memory inside a DataFusion [`SessionContext`].
///
/// Scripts run with DataFusion's SQL dialect. A script is made atomic by snapshotting all
/// tables and views before it runs and restoring the snapshot when a statement fails.
/// Table writes in [`WriteMode::Replace`] are not atomic: a concurrent reader may briefly
/// see the table missing. Like a `DROP TABLE` without `CASCADE`, replacing a table that a
/// view reads from fails.
pub struct MemoryWarehouse {
    ctx: SessionContext,
    // serializes writes and scripts, snapshots must not interleave with other changes
    lock: Mutex<()>,
}

struct SchemaSnapshot {
    catalog: String,
    schema: String,
    tables: Vec<SavedTable>,
}

struct SavedTable {
    name: String,
    provider: Arc<dyn TableProvider>,
    /// Content of an in-memory base table, written back into the same provider on restore
    partitions: Option<Vec<Vec<RecordBatch>>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::with_context(SessionContext::new())
    }

    pub fn with_context(ctx: SessionContext) -> Self {
        Self {
            ctx,
            lock: Mutex::new(()),
        }
    }

    /// The underlying DataFusion context
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, WarehouseError> {
        Ok(self.ctx.table_exist(TableReference::bare(table))?)
    }

    pub async fn row_count(&self, table: &str) -> Result<usize, WarehouseError> {
        Ok(self.ctx.table(TableReference::bare(table)).await?.count().await?)
    }

    pub async fn column_names(&self, table: &str) -> Result<Vec<String>, WarehouseError> {
        let df = self.ctx.table(TableReference::bare(table)).await?;
        Ok(df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect())
    }

    /// Run a query and collect its result
    pub async fn query(&self, sql: &str) -> Result<Vec<RecordBatch>, WarehouseError> {
        Ok(self.ctx.sql(sql).await?.collect().await?)
    }

    async fn existing_table(
        &self,
        table: &TableReference,
    ) -> Result<Option<Arc<dyn TableProvider>>, WarehouseError> {
        if self.ctx.table_exist(table.clone())? {
            Ok(Some(self.ctx.table_provider(table.clone()).await?))
        } else {
            Ok(None)
        }
    }

    /// Views anywhere in the session whose plan scans `table` directly
    async fn dependent_views(&self, table: &str) -> Result<Vec<String>, WarehouseError> {
        let default_schema = self
            .ctx
            .state()
            .config()
            .options()
            .catalog
            .default_schema
            .clone();
        let mut views = Vec::new();

        for catalog_name in self.ctx.catalog_names() {
            let Some(catalog) = self.ctx.catalog(&catalog_name) else {
                continue;
            };

            for schema_name in catalog.schema_names() {
                let Some(schema) = catalog.schema(&schema_name) else {
                    continue;
                };

                for view_name in schema.table_names() {
                    let Some(provider) = schema.table(&view_name).await? else {
                        continue;
                    };
                    if provider.table_type() != TableType::View {
                        continue;
                    }
                    let Some(plan) = provider.get_logical_plan() else {
                        continue;
                    };

                    let mut reads_table = false;
                    plan.apply_with_subqueries(|node| {
                        if let LogicalPlan::TableScan(scan) = node {
                            let in_default_schema = scan
                                .table_name
                                .schema()
                                .is_none_or(|schema| schema == default_schema);
                            if in_default_schema && scan.table_name.table() == table {
                                reads_table = true;
                                return Ok(TreeNodeRecursion::Stop);
                            }
                        }
                        Ok(TreeNodeRecursion::Continue)
                    })?;

                    if reads_table {
                        views.push(view_name);
                    }
                }
            }
        }

        views.sort();
        Ok(views)
    }

    async fn snapshot(&self) -> Result<Vec<SchemaSnapshot>, WarehouseError> {
        let mut snapshots = Vec::new();

        for catalog_name in self.ctx.catalog_names() {
            let Some(catalog) = self.ctx.catalog(&catalog_name) else {
                continue;
            };

            for schema_name in catalog.schema_names() {
                let Some(schema) = catalog.schema(&schema_name) else {
                    continue;
                };

                let mut tables = Vec::new();
                for table_name in schema.table_names() {
                    let Some(provider) = schema.table(&table_name).await? else {
                        continue;
                    };

                    // base tables can be mutated in place by INSERT, keep a copy of their data
                    let saved = match provider.as_any().downcast_ref::<MemTable>() {
                        Some(mem) => {
                            let mut partitions = Vec::with_capacity(mem.batches.len());
                            for partition in &mem.batches {
                                partitions.push(partition.read().await.clone());
                            }
                            SavedTable {
                                name: table_name,
                                provider: Arc::clone(&provider),
                                partitions: Some(partitions),
                            }
                        }
                        None if provider.table_type() == TableType::Base => {
                            let partitions = self
                                .ctx
                                .read_table(Arc::clone(&provider))?
                                .collect_partitioned()
                                .await?;
                            SavedTable {
                                name: table_name,
                                provider: mem_table(provider.schema(), partitions)?,
                                partitions: None,
                            }
                        }
                        None => SavedTable {
                            name: table_name,
                            provider,
                            partitions: None,
                        },
                    };

                    tables.push(saved);
                }

                snapshots.push(SchemaSnapshot {
                    catalog: catalog_name.clone(),
                    schema: schema_name,
                    tables,
                });
            }
        }

        Ok(snapshots)
    }

    /// Put every schema and table back as it was.
    ///
    /// In-memory tables get their old content back in the same provider, so views planned
    /// against them keep reading the restored rows.
    async fn restore(&self, snapshots: Vec<SchemaSnapshot>) -> Result<(), WarehouseError> {
        let known = snapshots
            .iter()
            .map(|snapshot| (snapshot.catalog.clone(), snapshot.schema.clone()))
            .collect::<HashSet<_>>();

        for catalog_name in self.ctx.catalog_names() {
            let Some(catalog) = self.ctx.catalog(&catalog_name) else {
                continue;
            };

            for schema_name in catalog.schema_names() {
                if !known.contains(&(catalog_name.clone(), schema_name.clone())) {
                    catalog.deregister_schema(&schema_name, true)?;
                }
            }
        }

        for snapshot in snapshots {
            let Some(catalog) = self.ctx.catalog(&snapshot.catalog) else {
                continue;
            };

            let schema = match catalog.schema(&snapshot.schema) {
                Some(schema) => schema,
                None => {
                    let schema: Arc<dyn SchemaProvider> = Arc::new(MemorySchemaProvider::new());
                    catalog.register_schema(&snapshot.schema, Arc::clone(&schema))?;
                    schema
                }
            };

            for table_name in schema.table_names() {
                schema.deregister_table(&table_name)?;
            }

            for saved in snapshot.tables {
                if let (Some(mem), Some(partitions)) = (
                    saved.provider.as_any().downcast_ref::<MemTable>(),
                    saved.partitions,
                ) {
                    for (partition, batches) in mem.batches.iter().zip(partitions) {
                        *partition.write().await = batches;
                    }
                }
                schema.register_table(saved.name, saved.provider)?;
            }
        }

        Ok(())
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWarehouse")
            .field("session_id", &self.ctx.session_id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn location(&self) -> String {
        format!("memory://{}", self.ctx.session_id())
    }

    async fn write_table(
        &self,
        table: &str,
        dataset: Dataset,
        mode: WriteMode,
    ) -> Result<usize, WarehouseError> {
        let _guard = self.lock.lock().await;

        let num_rows = dataset.num_rows();
        let table_ref = TableReference::bare(table);
        let existing = self.existing_table(&table_ref).await?;
        let (schema, batches) = dataset.into_parts();

        let partitions = match (mode, existing) {
            (WriteMode::Replace, existing) => {
                if let Some(existing) = existing {
                    let views = self.dependent_views(table).await?;
                    if !views.is_empty() {
                        return Err(WarehouseError::DependentViews {
                            table: table.to_string(),
                            views,
                        });
                    }

                    let before = field_names(&existing.schema());
                    let after = field_names(&schema);
                    if before != after {
                        warn!(
                            table,
                            ?before,
                            ?after,
                            "Column set of table changed, dependent scripts may need updating"
                        );
                    }
                }
                vec![batches]
            }
            (WriteMode::Append, None) => vec![batches],
            (WriteMode::Append, Some(existing)) => {
                if !same_columns(&existing.schema(), &schema) {
                    return Err(WarehouseError::SchemaMismatch {
                        table: table.to_string(),
                    });
                }

                // in place, so views over the table see the new rows
                if let Some(mem) = existing.as_any().downcast_ref::<MemTable>() {
                    if let Some(partition) = mem.batches.last() {
                        let target = existing.schema();
                        let batches = batches
                            .into_iter()
                            .map(|batch| {
                                RecordBatch::try_new(Arc::clone(&target), batch.columns().to_vec())
                            })
                            .collect::<Result<Vec<_>, _>>()
                            .map_err(DataFusionError::from)?;
                        partition.write().await.extend(batches);

                        debug!(table, num_rows, %mode, "Wrote table");
                        return Ok(num_rows);
                    }
                }

                let mut partitions = self.ctx.read_table(existing)?.collect_partitioned().await?;
                partitions.push(batches);
                partitions
            }
        };

        let provider = mem_table(schema, partitions)?;
        self.ctx.deregister_table(table_ref.clone())?;
        self.ctx.register_table(table_ref, provider)?;

        debug!(table, num_rows, %mode, "Wrote table");
        Ok(num_rows)
    }

    async fn execute_script(&self, script: &SqlScript) -> Result<usize, WarehouseError> {
        let _guard = self.lock.lock().await;
        let snapshot = self.snapshot().await?;

        for (i, statement) in script.statements.iter().enumerate() {
            let result = async { self.ctx.sql(statement).await?.collect().await }.await;

            if let Err(err) = result {
                warn!("ROLLBACK script {}: {err}", script.name());
                self.restore(snapshot).await?;

                return Err(WarehouseError::Statement {
                    number: i + 1,
                    source: Box::new(err.into()),
                });
            }
        }

        Ok(script.statements.len())
    }
}

fn mem_table(
    schema: SchemaRef,
    mut partitions: Vec<Vec<RecordBatch>>,
) -> Result<Arc<dyn TableProvider>, WarehouseError> {
    if partitions.is_empty() {
        partitions.push(Vec::new());
    }
    Ok(Arc::new(MemTable::try_new(schema, partitions)?))
}

fn field_names(schema: &SchemaRef) -> Vec<String> {
    schema
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect()
}

fn same_columns(left: &SchemaRef, right: &SchemaRef) -> bool {
    left.fields().len() == right.fields().len()
        && left
            .fields()
            .iter()
            .zip(right.fields().iter())
            .all(|(l, r)| l.name() == r.name() && l.data_type() == r.data_type())
}
