use crate::core::{Catalog, Result};
use crate::domain::model::{ColumnDefinition, TableDefinition};
use crate::utils::error::{aws_error, OpsError};
use async_trait::async_trait;
use aws_sdk_glue::Client as GlueClient;

const SERVICE: &str = "glue";
const PRIMARY_KEY_PARAMETER: &str = "isPrimaryKey";

#[derive(Debug, Clone)]
pub struct GlueCatalog {
    client: GlueClient,
}

impl GlueCatalog {
    pub fn new(client: GlueClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Catalog for GlueCatalog {
    async fn get_table(&self, database: &str, table: &str) -> Result<TableDefinition> {
        let output = self
            .client
            .get_table()
            .database_name(database)
            .name(table)
            .send()
            .await
            .map_err(|e| aws_error(SERVICE, "GetTable", e))?;

        let glue_table = output.table().ok_or_else(|| {
            OpsError::processing(format!("Glue returned no table for {}.{}", database, table))
        })?;

        let columns = glue_table.storage_descriptor().map(|descriptor| {
            descriptor
                .columns()
                .iter()
                .map(|column| ColumnDefinition {
                    name: column.name().to_string(),
                    data_type: column.r#type().unwrap_or_default().to_string(),
                    is_primary_key: column
                        .parameters()
                        .and_then(|p| p.get(PRIMARY_KEY_PARAMETER))
                        .is_some_and(|v| v.eq_ignore_ascii_case("true")),
                })
                .collect()
        });

        Ok(TableDefinition {
            database: database.to_string(),
            name: glue_table.name().to_string(),
            columns,
        })
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .get_tables()
            .database_name(database)
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| aws_error(SERVICE, "GetTables", e))?;
            names.extend(page.table_list().iter().map(|t| t.name().to_string()));
        }
        Ok(names)
    }
}
