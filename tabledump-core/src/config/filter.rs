//! Column filter declarations.
//!
//! Only the declaration is modelled here. What a filter does to a value is
//! up to the dump engine; this crate only cares which filters read values
//! from other tables.

use crate::error::DumpError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator of the data-dependent filter variant.
pub const DATA_DEPENDENT: &str = "data_dependent";

/// One transformation rule applied to a column value.
///
/// Filters are written as mappings with a `type` key; every other key is a
/// parameter of the filter:
///
/// ```yaml
/// - { type: faker, formatter: email }
/// - { type: data_dependent, table: customers, column: email }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FilterEntry", into = "FilterEntry")]
pub enum FilterDeclaration {
    /// A self-contained transformation
    Plain {
        kind: String,
        params: Map<String, Value>,
    },
    /// A transformation that needs the original value of another
    /// table's column at dump time
    DataDependent {
        source_table: String,
        source_column: String,
        params: Map<String, Value>,
    },
}

impl FilterDeclaration {
    /// Creates a plain filter without parameters.
    pub fn plain(kind: impl Into<String>) -> Self {
        Self::Plain {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// Creates a data-dependent filter reading `source_table.source_column`.
    pub fn data_dependent(source_table: impl Into<String>, source_column: impl Into<String>) -> Self {
        Self::DataDependent {
            source_table: source_table.into(),
            source_column: source_column.into(),
            params: Map::new(),
        }
    }

    /// The filter's discriminator.
    pub fn kind(&self) -> &str {
        match self {
            Self::Plain { kind, .. } => kind,
            Self::DataDependent { .. } => DATA_DEPENDENT,
        }
    }

    /// Type-specific parameters.
    pub fn params(&self) -> &Map<String, Value> {
        match self {
            Self::Plain { params, .. } | Self::DataDependent { params, .. } => params,
        }
    }

    /// The `(table, column)` this filter reads from, for data-dependent filters.
    pub fn source(&self) -> Option<(&str, &str)> {
        match self {
            Self::DataDependent {
                source_table,
                source_column,
                ..
            } => Some((source_table, source_column)),
            Self::Plain { .. } => None,
        }
    }
}

/// Wire shape of a filter entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilterEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

impl TryFrom<FilterEntry> for FilterDeclaration {
    type Error = DumpError;

    fn try_from(entry: FilterEntry) -> Result<Self, Self::Error> {
        let FilterEntry { kind, mut params } = entry;

        if kind.trim().is_empty() {
            return Err(DumpError::configuration("filter type cannot be empty"));
        }

        if kind != DATA_DEPENDENT {
            return Ok(Self::Plain { kind, params });
        }

        let source_table = take_string(&mut params, "table")?;
        let source_column = take_string(&mut params, "column")?;

        Ok(Self::DataDependent {
            source_table,
            source_column,
            params,
        })
    }
}

impl From<FilterDeclaration> for FilterEntry {
    fn from(filter: FilterDeclaration) -> Self {
        match filter {
            FilterDeclaration::Plain { kind, params } => Self { kind, params },
            FilterDeclaration::DataDependent {
                source_table,
                source_column,
                mut params,
            } => {
                params.insert("table".to_string(), Value::String(source_table));
                params.insert("column".to_string(), Value::String(source_column));
                Self {
                    kind: DATA_DEPENDENT.to_string(),
                    params,
                }
            }
        }
    }
}

fn take_string(params: &mut Map<String, Value>, key: &str) -> crate::Result<String> {
    match params.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        Some(_) => Err(DumpError::configuration(format!(
            "{} filter requires '{}' to be a non-empty string",
            DATA_DEPENDENT, key
        ))),
        None => Err(DumpError::configuration(format!(
            "{} filter requires '{}'",
            DATA_DEPENDENT, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_filter_keeps_params() {
        let filter: FilterDeclaration =
            serde_yaml::from_str("{ type: faker, formatter: email, locale: de_DE }").unwrap();

        assert_eq!(filter.kind(), "faker");
        assert_eq!(filter.params().get("formatter"), Some(&Value::from("email")));
        assert_eq!(filter.params().len(), 2);
        assert!(filter.source().is_none());
    }

    #[test]
    fn test_data_dependent_filter() {
        let filter: FilterDeclaration = serde_yaml::from_str(
            "{ type: data_dependent, table: customers, column: email, format: lower }",
        )
        .unwrap();

        assert_eq!(filter.kind(), DATA_DEPENDENT);
        assert_eq!(filter.source(), Some(("customers", "email")));
        // source keys are lifted out of the parameters
        assert_eq!(filter.params().len(), 1);
        assert!(filter.params().contains_key("format"));
    }

    #[test]
    fn test_data_dependent_requires_table_and_column() {
        let missing_column: Result<FilterDeclaration, _> =
            serde_yaml::from_str("{ type: data_dependent, table: customers }");
        assert!(missing_column.is_err());

        let wrong_type: Result<FilterDeclaration, _> =
            serde_json::from_str(r#"{"type": "data_dependent", "table": 3, "column": "id"}"#);
        assert!(wrong_type.is_err());
    }

    #[test]
    fn test_missing_discriminator_rejected() {
        let result: Result<FilterDeclaration, _> = serde_yaml::from_str("{ formatter: email }");
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_back_to_wire_shape() {
        let filter = FilterDeclaration::data_dependent("customers", "email");
        let value = serde_json::to_value(&filter).unwrap();

        assert_eq!(
            value,
            serde_json::json!({"type": "data_dependent", "table": "customers", "column": "email"})
        );
    }
}
