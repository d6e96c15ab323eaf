//! Configuration file schema
//!
//! Every field is optional so a file only lists what it overrides.

use serde::{Deserialize, Serialize};

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    /// Schema version (always 1 for v1); optional here so a missing field
    /// can be reported as such
    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<OrderingOverrides>,
}

/// Overrides of `OrderingConfig` fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_key_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refetch_on_commit: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
