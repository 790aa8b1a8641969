//! MCP `get_attributes` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `get_attributes` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetAttributesParams {
    #[schemars(description = "Subject identifier (e.g. 'dojo.con.joe') or display name")]
    pub subject: String,

    #[schemars(description = "Also list soft-deleted facts (value null). Defaults to false.")]
    pub include_deleted: Option<bool>,
}
