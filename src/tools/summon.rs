//! MCP `summon` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `summon` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SummonParams {
    #[schemars(
        description = "Free text to summon: a statement (\"Joe's coffee is Espresso\") or a question (\"What is Joe's coffee?\")"
    )]
    pub text: String,

    #[schemars(description = "Where the user was, free-form (e.g. coordinates or a place name)")]
    pub location: Option<String>,

    #[schemars(description = "Weather at the time, free-form")]
    pub weather: Option<String>,

    #[schemars(description = "Id of the message, call or note the text came from")]
    pub source_id: Option<String>,

    #[schemars(description = "What triggered the summoning (voice, widget, shortcut, ...)")]
    pub trigger: Option<String>,

    #[schemars(description = "Caller confidence 0.0-1.0. Defaults to the extraction confidence.")]
    pub confidence: Option<f64>,

    #[schemars(description = "Id of the device the text came from")]
    pub device_id: Option<String>,
}
