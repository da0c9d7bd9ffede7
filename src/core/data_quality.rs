use crate::core::query::QueryRunner;
use crate::core::{Catalog, QueryEngine, Result};
use crate::domain::model::ColumnDefinition;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    DataType,
    Completeness,
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub column: String,
    pub kind: CheckKind,
    /// Rows (or duplicated keys) violating the check.
    pub violations: u64,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.violations == 0
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = &self.column;
        match (self.kind, self.passed()) {
            (CheckKind::DataType, true) => write!(f, "Data type for column '{column}' is consistent."),
            (CheckKind::DataType, false) => write!(
                f,
                "Data type mismatch found in column '{column}' ({} rows).",
                self.violations
            ),
            (CheckKind::Completeness, true) => write!(f, "No null values found in column '{column}'."),
            (CheckKind::Completeness, false) => write!(
                f,
                "Null values found in column '{column}' ({} rows).",
                self.violations
            ),
            (CheckKind::PrimaryKey, true) => {
                write!(f, "Primary key for column '{column}' is consistent.")
            }
            (CheckKind::PrimaryKey, false) => write!(
                f,
                "Duplicate values found in primary key column '{column}' ({} keys).",
                self.violations
            ),
        }
    }
}

/// One report line: a check result or an informational note.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    Check(CheckOutcome),
    Note(String),
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportEntry::Check(outcome) => write!(f, "{}", outcome),
            ReportEntry::Note(note) => f.write_str(note),
        }
    }
}

/// Entries are kept in the order the checks ran, column by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableReport {
    pub database: String,
    pub table: String,
    pub entries: Vec<ReportEntry>,
}

impl TableReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Check(outcome) => Some(outcome),
            ReportEntry::Note(_) => None,
        })
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Note(note) => Some(note.as_str()),
            ReportEntry::Check(_) => None,
        })
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes().all(CheckOutcome::passed)
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    fn record(&mut self, column: &str, kind: CheckKind, violations: u64) {
        self.entries.push(ReportEntry::Check(CheckOutcome {
            column: column.to_string(),
            kind,
            violations,
        }));
    }

    fn note(&mut self, note: impl Into<String>) {
        self.entries.push(ReportEntry::Note(note.into()));
    }
}

pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(database), quote_identifier(table))
}

/// Glue stores Hive type names; Athena's `TRY_CAST` wants the Trino spelling.
pub fn athena_cast_type(glue_type: &str) -> String {
    match glue_type.trim().to_ascii_lowercase().as_str() {
        "string" => "varchar".to_string(),
        "int" => "integer".to_string(),
        "float" => "real".to_string(),
        other => other.to_string(),
    }
}

pub fn data_type_query(database: &str, table: &str, column: &ColumnDefinition) -> String {
    let column_name = quote_identifier(&column.name);
    format!(
        "SELECT COUNT(*) FROM {} WHERE TRY_CAST({} AS {}) IS NULL",
        qualified_table(database, table),
        column_name,
        athena_cast_type(&column.data_type)
    )
}

pub fn null_count_query(database: &str, table: &str, column: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
        qualified_table(database, table),
        quote_identifier(column)
    )
}

pub fn duplicate_key_query(database: &str, table: &str, column: &str) -> String {
    let column_name = quote_identifier(column);
    format!(
        "SELECT COUNT(*) FROM (SELECT {} FROM {} GROUP BY {} HAVING COUNT(*) > 1)",
        column_name,
        qualified_table(database, table),
        column_name
    )
}

/// Checks a Glue table's data through Athena: type consistency and
/// completeness for every column, uniqueness for primary-key columns.
pub struct DataQualityChecker<C: Catalog, Q: QueryEngine> {
    catalog: C,
    runner: QueryRunner<Q>,
}

impl<C: Catalog, Q: QueryEngine> DataQualityChecker<C, Q> {
    pub fn new(catalog: C, runner: QueryRunner<Q>) -> Self {
        Self { catalog, runner }
    }

    pub async fn validate_table(&self, database: &str, table: &str) -> Result<TableReport> {
        let definition = self.catalog.get_table(database, table).await?;
        let mut report = TableReport {
            database: database.to_string(),
            table: table.to_string(),
            ..Default::default()
        };

        let columns = match definition.columns {
            None => {
                report.note("No 'StorageDescriptor' key found in table metadata.");
                return Ok(report);
            }
            Some(columns) if columns.is_empty() => {
                report.note("No 'Columns' key found in StorageDescriptor.");
                return Ok(report);
            }
            Some(columns) => columns,
        };

        for column in &columns {
            tracing::info!("Validating data type for column '{}'...", column.name);
            let violations = self
                .runner
                .run_count_query(&data_type_query(database, table, column), database)
                .await?;
            report.record(&column.name, CheckKind::DataType, violations);

            tracing::info!("Validating null values for column '{}'...", column.name);
            let violations = self
                .runner
                .run_count_query(&null_count_query(database, table, &column.name), database)
                .await?;
            report.record(&column.name, CheckKind::Completeness, violations);

            if column.is_primary_key {
                tracing::info!("Validating primary key for column '{}'...", column.name);
                let violations = self
                    .runner
                    .run_count_query(&duplicate_key_query(database, table, &column.name), database)
                    .await?;
                report.record(&column.name, CheckKind::PrimaryKey, violations);
            } else {
                report.note(format!("Column '{}' is not a primary key.", column.name));
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{QueryRows, QueryState, QueryStatus, TableDefinition};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct StaticCatalog(Option<Vec<ColumnDefinition>>);

    #[async_trait]
    impl Catalog for StaticCatalog {
        async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
            Ok(TableDefinition {
                database: database.to_string(),
                name: table.to_string(),
                columns: self.0.clone(),
            })
        }

        async fn list_tables(&self, _database: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    /// Answers each query with the count registered for a substring of it.
    #[derive(Clone, Default)]
    struct CountingEngine {
        counts: Vec<(&'static str, u64)>,
        queries: Arc<Mutex<HashMap<String, String>>>,
    }

    #[async_trait]
    impl QueryEngine for CountingEngine {
        async fn start_query(&self, query: &str, _db: &str, _out: &str) -> Result<String> {
            let mut queries = self.queries.lock().await;
            let id = format!("q{}", queries.len());
            queries.insert(id.clone(), query.to_string());
            Ok(id)
        }

        async fn query_status(&self, _id: &str) -> Result<QueryStatus> {
            Ok(QueryStatus {
                state: QueryState::Succeeded,
                reason: None,
            })
        }

        async fn query_results(&self, id: &str) -> Result<QueryRows> {
            let queries = self.queries.lock().await;
            let query = &queries[id];
            let count = self
                .counts
                .iter()
                .find(|(needle, _)| query.contains(needle))
                .map(|(_, count)| *count)
                .unwrap_or(0);
            Ok(vec![vec![Some("_col0".into())], vec![Some(count.to_string())]])
        }
    }

    fn column(name: &str, data_type: &str, is_primary_key: bool) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_primary_key,
        }
    }

    fn checker(
        columns: Option<Vec<ColumnDefinition>>,
        engine: CountingEngine,
    ) -> DataQualityChecker<StaticCatalog, CountingEngine> {
        let runner = QueryRunner::new(engine, "s3://athena-results/".to_string())
            .with_poll_interval(Duration::from_millis(1));
        DataQualityChecker::new(StaticCatalog(columns), runner)
    }

    #[test]
    fn queries_quote_identifiers_and_map_types() {
        let col = column("order_id", "string", true);
        assert_eq!(
            data_type_query("sales", "orders", &col),
            "SELECT COUNT(*) FROM \"sales\".\"orders\" WHERE TRY_CAST(\"order_id\" AS varchar) IS NULL"
        );
        assert_eq!(
            null_count_query("sales", "orders", "order_id"),
            "SELECT COUNT(*) FROM \"sales\".\"orders\" WHERE \"order_id\" IS NULL"
        );
        assert_eq!(
            duplicate_key_query("sales", "orders", "order_id"),
            "SELECT COUNT(*) FROM (SELECT \"order_id\" FROM \"sales\".\"orders\" GROUP BY \"order_id\" HAVING COUNT(*) > 1)"
        );
        assert_eq!(athena_cast_type("decimal(10,2)"), "decimal(10,2)");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn primary_key_columns_get_uniqueness_check() {
        let engine = CountingEngine {
            counts: vec![("GROUP BY", 3), ("\"amount\" IS NULL", 5)],
            ..Default::default()
        };
        let checker = checker(
            Some(vec![column("id", "bigint", true), column("amount", "double", false)]),
            engine,
        );

        let report = checker.validate_table("sales", "orders").await.unwrap();

        let kinds: Vec<(&str, CheckKind, u64)> = report
            .outcomes()
            .map(|o| (o.column.as_str(), o.kind, o.violations))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("id", CheckKind::DataType, 0),
                ("id", CheckKind::Completeness, 0),
                ("id", CheckKind::PrimaryKey, 3),
                ("amount", CheckKind::DataType, 0),
                ("amount", CheckKind::Completeness, 5),
            ]
        );
        assert!(!report.all_passed());
        assert_eq!(
            report.notes().collect::<Vec<_>>(),
            vec!["Column 'amount' is not a primary key."]
        );
    }

    #[tokio::test]
    async fn report_lines_follow_column_order() {
        let engine = CountingEngine {
            counts: vec![("GROUP BY", 3)],
            ..Default::default()
        };
        let report = checker(
            Some(vec![
                column("note", "string", false),
                column("id", "bigint", true),
                column("amount", "double", false),
            ]),
            engine,
        )
        .validate_table("sales", "orders")
        .await
        .unwrap();

        assert_eq!(
            report.lines(),
            vec![
                "Data type for column 'note' is consistent.",
                "No null values found in column 'note'.",
                "Column 'note' is not a primary key.",
                "Data type for column 'id' is consistent.",
                "No null values found in column 'id'.",
                "Duplicate values found in primary key column 'id' (3 keys).",
                "Data type for column 'amount' is consistent.",
                "No null values found in column 'amount'.",
                "Column 'amount' is not a primary key.",
            ]
        );
    }

    #[tokio::test]
    async fn missing_storage_descriptor_is_a_note() {
        let report = checker(None, CountingEngine::default())
            .validate_table("sales", "orders")
            .await
            .unwrap();
        assert_eq!(report.outcomes().count(), 0);
        assert_eq!(
            report.lines(),
            vec!["No 'StorageDescriptor' key found in table metadata."]
        );

        let report = checker(Some(vec![]), CountingEngine::default())
            .validate_table("sales", "orders")
            .await
            .unwrap();
        assert_eq!(report.lines(), vec!["No 'Columns' key found in StorageDescriptor."]);
        assert!(report.all_passed());
    }
}
