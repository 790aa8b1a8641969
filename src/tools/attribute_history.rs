use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AttributeHistoryParams {
    #[schemars(description = "Subject identifier (e.g. 'dojo.ent.railroad') or display name")]
    pub subject: String,

    #[schemars(description = "Attribute key (e.g. 'gate_code')")]
    pub key: String,
}
