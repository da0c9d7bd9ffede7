use crate::core::query::QueryRunner;
use crate::core::{Catalog, QueryEngine, Result, Storage};
use crate::domain::model::QueryRows;

pub fn show_create_table_query(database: &str, table: &str) -> String {
    format!("SHOW CREATE TABLE `{}`.`{}`", database, table)
}

/// Athena's first row repeats the database-qualified `CREATE` line; it is
/// replaced by one naming the table alone so exports from different
/// databases line up when diffed.
pub fn render_ddl(table: &str, rows: &QueryRows) -> String {
    let body = rows
        .iter()
        .skip(1)
        .map(|row| {
            row.first()
                .and_then(|cell| cell.as_deref())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("CREATE EXTERNAL TABLE `{}` (\n{}", table, body)
}

pub fn ddl_file_name(table: &str) -> String {
    format!("{}.txt", table)
}

/// Writes the `SHOW CREATE TABLE` output of every table of a Glue database
/// to `<table>.txt` in the given storage.
pub struct DdlExporter<C: Catalog, Q: QueryEngine, S: Storage> {
    catalog: C,
    runner: QueryRunner<Q>,
    storage: S,
}

impl<C: Catalog, Q: QueryEngine, S: Storage> DdlExporter<C, Q, S> {
    pub fn new(catalog: C, runner: QueryRunner<Q>, storage: S) -> Self {
        Self {
            catalog,
            runner,
            storage,
        }
    }

    pub async fn export_database(&self, database: &str) -> Result<Vec<String>> {
        let tables = self.catalog.list_tables(database).await?;
        tracing::info!("Exporting DDL of {} tables from {}", tables.len(), database);

        let mut written = Vec::with_capacity(tables.len());
        for table in &tables {
            written.push(self.export_table(database, table).await?);
        }
        Ok(written)
    }

    pub async fn export_table(&self, database: &str, table: &str) -> Result<String> {
        let query_execution_id = self
            .runner
            .run_query(&show_create_table_query(database, table), database)
            .await?;
        let rows = self.runner.fetch_rows(&query_execution_id).await?;

        let file_name = ddl_file_name(table);
        self.storage
            .write_file(&file_name, render_ddl(table, &rows).as_bytes())
            .await?;

        tracing::info!("DDL for table {}.{} exported to '{}'", database, table, file_name);
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> QueryRows {
        lines.iter().map(|l| vec![Some(l.to_string())]).collect()
    }

    #[test]
    fn render_replaces_qualified_header() {
        let ddl = render_ddl(
            "orders",
            &rows(&[
                "CREATE EXTERNAL TABLE `db_hudi.orders`(",
                "  `id` bigint, ",
                "  `amount` double)",
                "LOCATION",
                "  's3://lakehouse-stage/orders'",
            ]),
        );

        assert_eq!(
            ddl,
            "CREATE EXTERNAL TABLE `orders` (\n  `id` bigint, \n  `amount` double)\nLOCATION\n  's3://lakehouse-stage/orders'"
        );
    }

    #[test]
    fn render_tolerates_empty_cells() {
        let result: QueryRows = vec![vec![Some("header".into())], vec![None], vec![]];
        assert_eq!(render_ddl("t", &result), "CREATE EXTERNAL TABLE `t` (\n\n");
    }

    #[test]
    fn show_create_table_quotes_names() {
        assert_eq!(
            show_create_table_query("db_hudi", "orders"),
            "SHOW CREATE TABLE `db_hudi`.`orders`"
        );
    }
}
