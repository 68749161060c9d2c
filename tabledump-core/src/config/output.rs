//! Output profile handed through to the dump writers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how the dump is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputProfile {
    /// Target file; writers fall back to stdout when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Maximum number of rows per generated statement
    #[serde(default = "default_rows_per_statement")]
    pub rows_per_statement: u32,
    /// Whether writers should compress their output
    #[serde(default)]
    pub compress: bool,
}

fn default_rows_per_statement() -> u32 {
    100
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self {
            file: None,
            rows_per_statement: default_rows_per_statement(),
            compress: false,
        }
    }
}

impl OutputProfile {
    /// Validates output settings.
    ///
    /// # Errors
    /// Returns error if `rows_per_statement` is zero
    pub fn validate(&self) -> crate::Result<()> {
        if self.rows_per_statement == 0 {
            return Err(crate::error::DumpError::configuration(
                "output.rows_per_statement must be greater than 0",
            ));
        }
        Ok(())
    }
}
