use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecentEntriesParams {
    #[schemars(description = "How many entries to return (1-100). Defaults to 20.")]
    pub limit: Option<usize>,
}
