use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetAttributeParams {
    #[schemars(description = "Subject identifier (e.g. 'dojo.con.joe') or display name")]
    pub subject: String,

    #[schemars(description = "Attribute key to forget (e.g. 'coffee' or 'gate code')")]
    pub key: String,
}
