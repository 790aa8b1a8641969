use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InferenceHealthParams {
    #[schemars(description = "Query the endpoint now instead of using the cached state. Defaults to false.")]
    pub force: Option<bool>,
}
