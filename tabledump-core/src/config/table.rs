//! Table and column declarations.

use super::filter::FilterDeclaration;
use crate::error::DumpError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A column and the filters applied to its values, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDeclaration {
    name: String,
    filters: Vec<FilterDeclaration>,
}

impl ColumnDeclaration {
    /// Creates a column declaration.
    pub fn new(name: impl Into<String>, filters: Vec<FilterDeclaration>) -> Self {
        Self {
            name: name.into(),
            filters,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filters in application order.
    pub fn filters(&self) -> &[FilterDeclaration] {
        &self.filters
    }
}

/// Export behaviour of one database table.
///
/// `collect_columns` is owned by resolution: it starts empty and only grows
/// while [`DumperConfig`](super::DumperConfig) links data-dependent filters
/// to their source tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDeclaration {
    name: String,
    dependencies: Vec<String>,
    columns: Vec<ColumnDeclaration>,
    collect_columns: BTreeSet<String>,
    ignore_table: bool,
    ignore_content: bool,
    limit: Option<u64>,
    order_by: Option<String>,
}

impl TableDeclaration {
    /// Creates an empty declaration, as used for dependency placeholders.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            columns: Vec::new(),
            collect_columns: BTreeSet::new(),
            ignore_table: false,
            ignore_content: false,
            limit: None,
            order_by: None,
        }
    }

    /// Builder method to add a dependency. Duplicates are ignored.
    pub fn with_dependency(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        if !self.dependencies.contains(&table) {
            self.dependencies.push(table);
        }
        self
    }

    /// Builder method to append a column.
    pub fn with_column(mut self, column: ColumnDeclaration) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder method to cap the number of dumped rows.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables that must be resolvable before this table's filters can run.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDeclaration] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDeclaration> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns whose original values other tables' filters need.
    pub fn collect_columns(&self) -> &BTreeSet<String> {
        &self.collect_columns
    }

    /// Whether the table is skipped entirely.
    pub fn ignore_table(&self) -> bool {
        self.ignore_table
    }

    /// Whether only the structure of the table is dumped.
    pub fn ignore_content(&self) -> bool {
        self.ignore_content
    }

    /// Maximum number of rows to dump.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Raw ordering clause for the row query.
    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// True if any filter in this table reads from another table.
    pub fn has_data_dependent_filters(&self) -> bool {
        self.data_dependencies().next().is_some()
    }

    /// Yields `(column, source_table, source_column)` for every
    /// data-dependent filter, in declaration order.
    pub fn data_dependencies(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.columns.iter().flat_map(|column| {
            column.filters.iter().filter_map(move |filter| {
                filter
                    .source()
                    .map(|(table, source_column)| (column.name(), table, source_column))
            })
        })
    }

    pub(crate) fn add_collect_column(&mut self, column: impl Into<String>) {
        self.collect_columns.insert(column.into());
    }

    pub(crate) fn from_raw(name: String, raw: RawTable) -> crate::Result<Self> {
        if raw.limit == Some(0) {
            return Err(DumpError::configuration(format!(
                "tables.{}.limit must be greater than 0",
                name
            )));
        }

        let mut table = Self::new(name);
        for dependency in raw.dependencies {
            table = table.with_dependency(dependency);
        }

        table.columns = raw
            .columns
            .into_iter()
            .map(|(column, raw_column)| {
                ColumnDeclaration::new(column, raw_column.unwrap_or_default().filters)
            })
            .collect();
        table.ignore_table = raw.ignore_table;
        table.ignore_content = raw.ignore_content;
        table.limit = raw.limit;
        table.order_by = raw.order_by;

        Ok(table)
    }
}

/// Wire shape of one `tables` entry.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTable {
    #[serde(default)]
    columns: IndexMap<String, Option<RawColumn>>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    ignore_table: bool,
    #[serde(default)]
    ignore_content: bool,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    order_by: Option<String>,
}

/// Wire shape of one `columns` entry.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawColumn {
    #[serde(default)]
    filters: Vec<FilterDeclaration>,
}
