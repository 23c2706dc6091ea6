//! Analysis configuration.
//!
//! Collects the machine description (word size, endianness), the textual
//! identifier families used for synthesized variables, the names of the
//! source-level annotation functions, and the SMT array modelling mode.
//! Loadable from JSON; [`Default`] gives the standard `__gt` family on a
//! 32-bit little-endian machine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Byte order of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

/// How array variables are modelled in the emitted SMT query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayMode {
    /// Nested array sorts, one per index level.
    Nested,
    /// A single array sort whose index is the concatenation of all levels.
    Flat,
}

/// Configuration consumed by the analyzer core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Machine word size in bits.
    pub word_bits: u32,
    pub endianness: Endianness,
    /// Identifier for per-condition constraint booleans in the query.
    pub constraint_prefix: String,
    /// Prefix for fresh temporary variables (function formals etc.).
    pub temp_var_prefix: String,
    /// Prefix for temporary index variables substituted into array accesses.
    pub temp_index_prefix: String,
    /// Prefix for temporary pointers synthesized for address-taken variables.
    pub temp_pointer_prefix: String,
    /// Prefix for per-field array variables of aggregate accesses.
    pub field_prefix: String,
    /// Annotation joining a field array name to its aggregate type name.
    pub aggregate_prefix: String,
    /// Prefix for variables standing in for external function call results.
    pub efc_prefix: String,
    /// Name of the `assume` annotation function.
    pub assume_name: String,
    /// Name of the `simulate` annotation function.
    pub simulate_name: String,
    pub array_mode: ArrayMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            word_bits: 32,
            endianness: Endianness::Little,
            constraint_prefix: "c".into(),
            temp_var_prefix: "__gtTEMP".into(),
            temp_index_prefix: "__gtINDEX".into(),
            temp_pointer_prefix: "__gtPTR".into(),
            field_prefix: "__gtFIELD_".into(),
            aggregate_prefix: "__gtAGG_".into(),
            efc_prefix: "__gtEFC_".into(),
            assume_name: "gt_assume".into(),
            simulate_name: "gt_simulate".into(),
            array_mode: ArrayMode::Nested,
        }
    }
}

impl AnalysisConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The name of the per-field array for `field` within aggregate type
    /// `aggregate`, e.g. `__gtFIELD_x__gtAGG_point`.
    pub fn field_array_name(&self, field: &str, aggregate: &str) -> String {
        format!("{}{}{}{}", self.field_prefix, field, self.aggregate_prefix, aggregate)
    }

    /// The name standing in for the result of a call to `callee` at `line`.
    pub fn efc_name(&self, callee: &str, line: u32) -> String {
        format!("{}{}@{}", self.efc_prefix, callee, line)
    }
}
