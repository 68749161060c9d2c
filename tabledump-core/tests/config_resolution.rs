//! Configuration resolution tests.
//!
//! This test suite covers:
//! - Dependency closure (every named dependency ends up declared)
//! - Collect-column propagation for data-dependent filters
//! - Undeclared source tables reported as configuration errors
//! - Lookup consistency and deterministic resolution
//! - Loading configuration files from disk

use serde_json::json;
use std::io::Write;
use tabledump_core::{DumpError, DumperConfig, Result};

fn orders_and_customers() -> serde_json::Value {
    json!({
        "tables": {
            "orders": {
                "columns": {
                    "email": {
                        "filters": [
                            { "type": "data_dependent", "table": "customers", "column": "email" }
                        ]
                    }
                }
            },
            "customers": {}
        }
    })
}

// =============================================================================
// Dependency closure
// =============================================================================

#[test]
fn test_every_dependency_is_declared_after_resolution() -> Result<()> {
    let config = DumperConfig::from_value(json!({
        "tables": {
            "order_items": { "dependencies": ["orders", "products"] },
            "orders": { "dependencies": ["customers"] }
        }
    }))?;

    for table in config.tables() {
        for dependency in table.dependencies() {
            assert!(
                config.has_table(dependency),
                "dependency '{}' of '{}' is missing",
                dependency,
                table.name()
            );
        }
    }

    let placeholder = config.table("products").expect("placeholder for products");
    assert!(placeholder.columns().is_empty());
    assert!(placeholder.dependencies().is_empty());
    assert!(placeholder.collect_columns().is_empty());

    Ok(())
}

#[test]
fn test_declared_dependency_is_not_replaced_by_placeholder() -> Result<()> {
    let config = DumperConfig::from_yaml_str(
        r"
tables:
  orders:
    dependencies: [customers]
  customers:
    limit: 50
    columns:
      email:
        filters:
          - type: faker
            formatter: email
",
    )?;

    let customers = config.table("customers").expect("customers declared");
    assert_eq!(customers.limit(), Some(50));
    assert_eq!(customers.columns().len(), 1);
    Ok(())
}

// =============================================================================
// Collect-column propagation
// =============================================================================

#[test]
fn test_orders_customers_scenario() -> Result<()> {
    let config = DumperConfig::from_value(orders_and_customers())?;

    assert!(config.has_table("orders"));
    assert!(config.has_table("customers"));

    let customers = config.table("customers").expect("customers present");
    assert_eq!(
        customers.collect_columns().iter().collect::<Vec<_>>(),
        ["email"]
    );

    let orders = config.table("orders").expect("orders present");
    assert!(orders.dependencies().is_empty());
    assert!(orders.collect_columns().is_empty());
    Ok(())
}

#[test]
fn test_source_table_may_be_declared_after_referencing_table() -> Result<()> {
    // The source table appears later in the document than the filter
    let config = DumperConfig::from_yaml_str(
        r"
tables:
  invoices:
    columns:
      customer_name:
        filters:
          - { type: data_dependent, table: customers, column: name }
      customer_email:
        filters:
          - { type: data_dependent, table: customers, column: email }
  customers: ~
",
    )?;

    let customers = config.table("customers").expect("customers present");
    assert!(customers.collect_columns().contains("name"));
    assert!(customers.collect_columns().contains("email"));
    Ok(())
}

#[test]
fn test_source_table_reachable_through_dependency() -> Result<()> {
    let config = DumperConfig::from_value(json!({
        "tables": {
            "orders": {
                "dependencies": ["customers"],
                "columns": {
                    "email": {
                        "filters": [
                            { "type": "data_dependent", "table": "customers", "column": "email" }
                        ]
                    }
                }
            }
        }
    }))?;

    let customers = config.table("customers").expect("placeholder for customers");
    assert!(customers.collect_columns().contains("email"));
    Ok(())
}

#[test]
fn test_source_table_reachable_through_later_tables_dependency() -> Result<()> {
    // customers is only introduced as a dependency of a table declared after
    // the one holding the filter
    let config = DumperConfig::from_value(json!({
        "tables": {
            "orders": {
                "columns": {
                    "email": {
                        "filters": [
                            { "type": "data_dependent", "table": "customers", "column": "email" }
                        ]
                    }
                }
            },
            "invoices": { "dependencies": ["customers"] }
        }
    }))?;

    assert!(
        config
            .table("customers")
            .expect("placeholder for customers")
            .collect_columns()
            .contains("email")
    );
    Ok(())
}

#[test]
fn test_undeclared_source_table_is_reported() {
    let mut document = orders_and_customers();
    document["tables"]
        .as_object_mut()
        .expect("tables object")
        .remove("customers");

    let error = DumperConfig::from_value(document).unwrap_err();
    match &error {
        DumpError::UndeclaredTable {
            table,
            referenced_by,
        } => {
            assert_eq!(table, "customers");
            assert_eq!(referenced_by, "orders.email");
        }
        other => panic!("expected UndeclaredTable, got {:?}", other),
    }
    assert!(error.is_configuration());
    assert!(error.to_string().contains("customers"));
}

// =============================================================================
// Lookup and determinism
// =============================================================================

#[test]
fn test_lookup_agrees_with_presence() -> Result<()> {
    let config = DumperConfig::from_value(json!({
        "tables": {
            "a": { "dependencies": ["b"] },
            "c": {}
        }
    }))?;

    for name in ["a", "b", "c", "d", "", "A"] {
        assert_eq!(config.has_table(name), config.table(name).is_some(), "{}", name);
    }
    assert!(config.table("d").is_none());
    Ok(())
}

#[test]
fn test_resolution_is_deterministic() -> Result<()> {
    let document = json!({
        "tables": {
            "shipments": { "dependencies": ["orders", "carriers"] },
            "orders": {
                "dependencies": ["customers"],
                "columns": {
                    "email": {
                        "filters": [
                            { "type": "data_dependent", "table": "customers", "column": "email" }
                        ]
                    }
                }
            }
        }
    });

    let first = DumperConfig::from_value(document.clone())?;
    let second = DumperConfig::from_value(document)?;

    let first_tables: Vec<_> = first.tables().collect();
    let second_tables: Vec<_> = second.tables().collect();
    assert_eq!(first_tables, second_tables);

    let names: Vec<_> = first.tables().map(|t| t.name()).collect();
    assert_eq!(names, ["shipments", "orders", "carriers", "customers"]);
    Ok(())
}

#[test]
fn test_value_and_json_loaders_keep_declaration_order() -> Result<()> {
    let document = r#"{"tables": {"zeta": {}, "alpha": {"dependencies": ["omega", "beta"]}, "mid": {}}}"#;

    let from_json = DumperConfig::from_json_str(document)?;
    let value: serde_json::Value = serde_json::from_str(document).expect("valid JSON");
    let from_value = DumperConfig::from_value(value)?;

    let json_names: Vec<_> = from_json.tables().map(|t| t.name()).collect();
    let value_names: Vec<_> = from_value.tables().map(|t| t.name()).collect();
    assert_eq!(json_names, ["zeta", "alpha", "mid", "omega", "beta"]);
    assert_eq!(value_names, json_names);
    Ok(())
}

#[test]
fn test_dependency_order_and_cycles() -> Result<()> {
    let config = DumperConfig::from_value(json!({
        "tables": {
            "order_items": { "dependencies": ["orders", "products"] },
            "orders": { "dependencies": ["customers"] }
        }
    }))?;
    let order = config.dependency_order()?;
    let position = |name: &str| order.iter().position(|t| *t == name).expect(name);
    assert!(position("customers") < position("orders"));
    assert!(position("orders") < position("order_items"));
    assert!(position("products") < position("order_items"));

    // Cycles resolve but cannot be ordered
    let cyclic = DumperConfig::from_value(json!({
        "tables": {
            "a": { "dependencies": ["b"] },
            "b": { "dependencies": ["a"] }
        }
    }))?;
    match cyclic.dependency_order() {
        Err(DumpError::DependencyCycle { tables }) => assert_eq!(tables, ["a", "b", "a"]),
        other => panic!("expected a cycle, got {:?}", other),
    }
    Ok(())
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_file() -> Result<()> {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp file");
    writeln!(
        file,
        r"
database:
  driver: mysql
  host: db.internal
  user: dumper
  password: hunter2
  dbname: shop
  charset: utf8mb4
output:
  rows_per_statement: 500
dumper: Sql
table_allow_list: [orders]
tables:
  orders:
    dependencies: [customers]
"
    )
    .expect("write config");

    let config = DumperConfig::load(file.path())?;
    assert_eq!(config.database().dbname.as_deref(), Some("shop"));
    assert_eq!(config.database().password(), Some("hunter2"));
    assert_eq!(config.output().rows_per_statement, 500);
    assert_eq!(config.engine(), Some("Sql"));
    assert!(config.is_table_allowed("orders"));
    assert!(!config.is_table_allowed("customers"));
    assert!(config.has_table("customers"));
    Ok(())
}

#[test]
fn test_load_json_file_and_reject_unknown_extension() -> Result<()> {
    let dir = tempfile::tempdir().expect("create temp dir");

    let json_path = dir.path().join("dump.json");
    std::fs::write(&json_path, orders_and_customers().to_string()).expect("write config");
    let config = DumperConfig::load(&json_path)?;
    assert!(
        config
            .table("customers")
            .expect("customers present")
            .collect_columns()
            .contains("email")
    );

    let toml_path = dir.path().join("dump.toml");
    std::fs::write(&toml_path, "").expect("write config");
    assert!(DumperConfig::load(&toml_path).unwrap_err().is_configuration());

    let missing = DumperConfig::load(dir.path().join("missing.yaml")).unwrap_err();
    assert!(matches!(missing, DumpError::Io { .. }));
    Ok(())
}

#[test]
fn test_malformed_documents_fail_fast() {
    let cases = [
        json!({ "tables": { "orders": { "colums": {} } } }),
        json!({ "tables": { "orders": { "columns": { "email": { "filters": [
            { "type": "data_dependent", "table": "customers" }
        ] } } } } }),
        json!({ "tables": { "orders": { "columns": { "email": { "filters": [
            { "column": "email" }
        ] } } } } }),
        json!({ "tables": { "orders": { "limit": 0 } } }),
        json!({ "database": { "driver": "oracle" } }),
        json!({ "unexpected": true }),
    ];

    for case in cases {
        let error = DumperConfig::from_value(case.clone()).unwrap_err();
        assert!(error.is_configuration(), "{} -> {:?}", case, error);
    }
}
