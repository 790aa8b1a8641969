//! MCP `search_ledger` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search_ledger` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchLedgerParams {
    #[schemars(description = "Case-insensitive substring to look for in ledger text, names, keys and values")]
    pub query: String,

    #[schemars(description = "Maximum hits per table (1-100). Defaults to 20.")]
    pub limit: Option<usize>,
}
