//! Dump configuration and its resolution into a dependency-closed graph.
//!
//! # Module Structure
//! - `database`: connection profile (credentials kept out of output)
//! - `output`: settings handed to the writers
//! - `table` / `filter`: per-table declarations
//! - `engine`: registry of dump engines
//!
//! Tables refer to each other by name, so a configuration is resolved in two
//! phases. The build phase turns every `tables` entry into a
//! [`TableDeclaration`]. The link phase then adds an empty placeholder for
//! every dependency that was not declared, and records each data-dependent
//! filter's source column in the source table's collect-columns.

mod database;
mod engine;
mod filter;
mod output;
mod table;

pub use database::DatabaseProfile;
pub(crate) use database::is_plain_identifier;
pub use engine::{ENGINE_NAMESPACE, EngineRegistry};
pub use filter::{DATA_DEPENDENT, FilterDeclaration};
pub use output::OutputProfile;
pub use table::{ColumnDeclaration, TableDeclaration};

use crate::error::DumpError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use table::RawTable;
use tracing::{debug, warn};

/// Resolved dump configuration.
///
/// After construction every dependency of every table is present in the
/// table mapping, and every data-dependent filter's source column is listed
/// in its source table's collect-columns.
///
/// # Example
/// ```rust
/// use tabledump_core::config::DumperConfig;
///
/// let config = DumperConfig::from_yaml_str(r#"
/// tables:
///   orders:
///     columns:
///       email:
///         filters:
///           - { type: data_dependent, table: customers, column: email }
///   customers: {}
/// "#).unwrap();
///
/// let customers = config.table("customers").unwrap();
/// assert!(customers.collect_columns().contains("email"));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct DumperConfig {
    database: DatabaseProfile,
    output: OutputProfile,
    tables: IndexMap<String, TableDeclaration>,
    dumper: Option<String>,
    table_allow_list: Vec<String>,
}

/// Wire shape of a configuration document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDumperConfig {
    #[serde(default)]
    database: Option<DatabaseProfile>,
    #[serde(default)]
    output: Option<OutputProfile>,
    #[serde(default)]
    tables: Option<IndexMap<String, Option<RawTable>>>,
    #[serde(default)]
    dumper: Option<String>,
    #[serde(default)]
    table_allow_list: Vec<String>,
}

impl DumperConfig {
    /// Loads and resolves a configuration file.
    ///
    /// `.json` files are parsed as JSON, `.yaml`/`.yml` as YAML.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, has an unsupported
    /// extension, or fails to parse or resolve.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DumpError::io(format!("Failed to read configuration {}", path.display()), e)
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(DumpError::configuration(format!(
                "unsupported configuration format: {} (expected .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Parses and resolves a YAML document.
    ///
    /// # Errors
    /// Returns a configuration error for malformed input or unresolvable
    /// table references.
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        // An empty document is an empty configuration
        if yaml.trim().is_empty() {
            return Self::resolve(RawDumperConfig::default());
        }
        let raw: RawDumperConfig = serde_yaml::from_str(yaml)
            .map_err(|e| DumpError::configuration(format!("invalid configuration: {}", e)))?;
        Self::resolve(raw)
    }

    /// Parses and resolves a JSON document.
    ///
    /// # Errors
    /// Same as [`DumperConfig::from_yaml_str`].
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let raw: RawDumperConfig = serde_json::from_str(json)
            .map_err(|e| DumpError::configuration(format!("invalid configuration: {}", e)))?;
        Self::resolve(raw)
    }

    /// Resolves an already parsed JSON value.
    ///
    /// # Errors
    /// Same as [`DumperConfig::from_yaml_str`].
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        let raw: RawDumperConfig = serde_json::from_value(value)
            .map_err(|e| DumpError::configuration(format!("invalid configuration: {}", e)))?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawDumperConfig) -> crate::Result<Self> {
        let database = raw.database.unwrap_or_default();
        database.validate()?;
        let output = raw.output.unwrap_or_default();
        output.validate()?;

        let mut config = Self {
            database,
            output,
            tables: IndexMap::new(),
            dumper: raw.dumper,
            table_allow_list: raw.table_allow_list,
        };

        // Build phase
        for (name, raw_table) in raw.tables.unwrap_or_default() {
            let table = TableDeclaration::from_raw(name.clone(), raw_table.unwrap_or_default())?;
            config.tables.insert(name, table);
        }

        // Link phase
        config.close_dependencies();
        config.propagate_collect_columns()?;

        if let Err(DumpError::DependencyCycle { tables }) = config.dependency_order() {
            warn!(cycle = %tables.join(" -> "), "Table dependencies contain a cycle");
        }

        debug!(tables = config.tables.len(), "Resolved dump configuration");
        Ok(config)
    }

    /// Inserts an empty placeholder for every dependency not yet declared.
    fn close_dependencies(&mut self) {
        let missing: Vec<String> = self
            .tables
            .values()
            .flat_map(TableDeclaration::dependencies)
            .filter(|dependency| !self.tables.contains_key(dependency.as_str()))
            .cloned()
            .collect();

        for name in missing {
            if !self.tables.contains_key(&name) {
                debug!(table = %name, "Adding placeholder for undeclared dependency");
                self.tables.insert(name.clone(), TableDeclaration::new(name));
            }
        }
    }

    /// Records every data-dependent filter's source column on its source table.
    fn propagate_collect_columns(&mut self) -> crate::Result<()> {
        let references: Vec<(String, String, String)> = self
            .tables
            .values()
            .flat_map(|table| {
                table
                    .data_dependencies()
                    .map(move |(column, source_table, source_column)| {
                        (
                            source_table.to_string(),
                            source_column.to_string(),
                            format!("{}.{}", table.name(), column),
                        )
                    })
            })
            .collect();

        for (source_table, source_column, referenced_by) in references {
            let source = self
                .tables
                .get_mut(&source_table)
                .ok_or_else(|| DumpError::undeclared_table(&source_table, referenced_by))?;
            source.add_collect_column(source_column);
        }

        Ok(())
    }

    /// Orders tables so that every table comes after its dependencies.
    ///
    /// Ties keep declaration order. Cycles are allowed in a configuration;
    /// engines that need an order get them reported here.
    ///
    /// # Errors
    /// Returns [`DumpError::DependencyCycle`] naming the tables on the cycle.
    pub fn dependency_order(&self) -> crate::Result<Vec<&str>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            tables: &'a IndexMap<String, TableDeclaration>,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
            order: &mut Vec<&'a str>,
        ) -> crate::Result<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|entry| *entry == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|entry| entry.to_string()).collect();
                    cycle.push(name.to_string());
                    return Err(DumpError::DependencyCycle { tables: cycle });
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);
            path.push(name);
            if let Some(table) = tables.get(name) {
                for dependency in table.dependencies() {
                    visit(tables, dependency, marks, path, order)?;
                }
            }
            path.pop();
            marks.insert(name, Mark::Done);
            order.push(name);
            Ok(())
        }

        let mut marks = HashMap::with_capacity(self.tables.len());
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.tables.len());
        for name in self.tables.keys() {
            visit(&self.tables, name, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    /// Database connection profile.
    pub fn database(&self) -> &DatabaseProfile {
        &self.database
    }

    /// Output profile.
    pub fn output(&self) -> &OutputProfile {
        &self.output
    }

    /// All table declarations, in first-declared order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDeclaration> {
        self.tables.values()
    }

    /// Checks whether a table is declared.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Looks up a table declaration; `None` if it does not exist.
    pub fn table(&self, name: &str) -> Option<&TableDeclaration> {
        self.tables.get(name)
    }

    /// Adds a table declaration, replacing any declaration with the same name.
    ///
    /// The table is taken as-is: it is not linked against the rest of the
    /// configuration.
    pub fn add_table(&mut self, table: TableDeclaration) -> &TableDeclaration {
        let name = table.name().to_string();
        let (index, _) = self.tables.insert_full(name, table);
        &self.tables[index]
    }

    /// Tables the dump engine should restrict itself to; empty means all.
    pub fn table_allow_list(&self) -> &[String] {
        &self.table_allow_list
    }

    /// Replaces the table allow-list.
    pub fn set_table_allow_list(&mut self, tables: Vec<String>) -> &mut Self {
        self.table_allow_list = tables;
        self
    }

    /// Checks a table name against the allow-list.
    pub fn is_table_allowed(&self, name: &str) -> bool {
        self.table_allow_list.is_empty() || self.table_allow_list.iter().any(|t| t == name)
    }

    /// Configured dump engine identifier (`dumper` key).
    pub fn engine(&self) -> Option<&str> {
        self.dumper.as_deref()
    }

    /// Sets the dump engine identifier.
    pub fn set_engine(&mut self, identifier: impl Into<String>) -> &mut Self {
        self.dumper = Some(identifier.into());
        self
    }

    /// Engine type name derived by convention, e.g.
    /// `tabledump::dumpers::SqlDumper` for `dumper: Sql`.
    ///
    /// Prefer [`EngineRegistry`] for instantiation; this name is kept for
    /// diagnostics and for hosts that resolve engines by name.
    pub fn engine_type_name(&self) -> Option<String> {
        self.engine()
            .map(|engine| format!("{}::{}Dumper", ENGINE_NAMESPACE, engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config = DumperConfig::from_value(json!({})).unwrap();
        assert_eq!(config.tables().count(), 0);
        assert!(config.database().driver.is_none());
        assert_eq!(config.output().rows_per_statement, 100);
        assert!(config.engine().is_none());
        assert!(config.table_allow_list().is_empty());

        let config = DumperConfig::from_yaml_str("").unwrap();
        assert_eq!(config.tables().count(), 0);
    }

    #[test]
    fn test_null_sections_default_to_empty() {
        let config = DumperConfig::from_yaml_str("database:\noutput:\ntables:\n").unwrap();
        assert_eq!(config.tables().count(), 0);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        let error = DumperConfig::from_value(json!({"tabels": {}})).unwrap_err();
        assert!(error.is_configuration());
    }

    #[test]
    fn test_dependencies_get_placeholders() {
        let config = DumperConfig::from_value(json!({
            "tables": {
                "orders": {"dependencies": ["customers", "products"]},
                "customers": {"dependencies": ["addresses"]}
            }
        }))
        .unwrap();

        let names: Vec<&str> = config.tables().map(TableDeclaration::name).collect();
        assert_eq!(names, ["orders", "customers", "products", "addresses"]);

        let placeholder = config.table("products").unwrap();
        assert!(placeholder.columns().is_empty());
        assert!(placeholder.dependencies().is_empty());
    }

    #[test]
    fn test_filter_source_reachable_via_later_dependency() {
        // `orders` references `customers` before `invoices` declares it as a dependency
        let config = DumperConfig::from_value(json!({
            "tables": {
                "orders": {"columns": {"email": {"filters": [
                    {"type": "data_dependent", "table": "customers", "column": "email"}
                ]}}},
                "invoices": {"dependencies": ["customers"]}
            }
        }))
        .unwrap();

        assert!(
            config
                .table("customers")
                .unwrap()
                .collect_columns()
                .contains("email")
        );
    }

    #[test]
    fn test_add_table_replaces_by_name() {
        let mut config = DumperConfig::from_value(json!({"tables": {"a": {}, "b": {}}})).unwrap();
        config.add_table(TableDeclaration::new("a").with_limit(10));
        config.add_table(TableDeclaration::new("c"));

        let names: Vec<&str> = config.tables().map(TableDeclaration::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(config.table("a").unwrap().limit(), Some(10));
    }

    #[test]
    fn test_allow_list() {
        let mut config =
            DumperConfig::from_value(json!({"table_allow_list": ["orders"]})).unwrap();
        assert!(config.is_table_allowed("orders"));
        assert!(!config.is_table_allowed("customers"));

        config.set_table_allow_list(Vec::new());
        assert!(config.is_table_allowed("customers"));
    }

    #[test]
    fn test_engine_type_name() {
        let mut config = DumperConfig::from_value(json!({"dumper": "Sql"})).unwrap();
        assert_eq!(config.engine(), Some("Sql"));
        assert_eq!(
            config.engine_type_name().as_deref(),
            Some("tabledump::dumpers::SqlDumper")
        );

        config.set_engine("Csv");
        assert_eq!(
            config.engine_type_name().as_deref(),
            Some("tabledump::dumpers::CsvDumper")
        );
    }

    #[test]
    fn test_dependency_order() {
        let config = DumperConfig::from_value(json!({
            "tables": {
                "order_items": {"dependencies": ["orders", "products"]},
                "orders": {"dependencies": ["customers"]},
                "customers": {}
            }
        }))
        .unwrap();

        assert_eq!(
            config.dependency_order().unwrap(),
            ["customers", "orders", "products", "order_items"]
        );
    }

    #[test]
    fn test_cycles_are_representable_but_reported() {
        let config = DumperConfig::from_value(json!({
            "tables": {
                "a": {"dependencies": ["b"]},
                "b": {"dependencies": ["a"]}
            }
        }))
        .unwrap();

        assert!(config.has_table("a") && config.has_table("b"));
        match config.dependency_order() {
            Err(DumpError::DependencyCycle { tables }) => assert_eq!(tables, ["a", "b", "a"]),
            other => panic!("expected dependency cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_database_profile_fails_fast() {
        let error =
            DumperConfig::from_value(json!({"database": {"driver": "oracle"}})).unwrap_err();
        assert!(error.to_string().contains("oracle"));
    }
}
