//! Dojo: a local, audited personal ledger.
//!
//! Free text such as "Joe's coffee is Espresso" is *summoned* into the
//! ledger. Every summoning is logged verbatim; facts extracted from it are
//! stored against a canonical identifier (`dojo.con.joe`) with the log entry
//! as their audit receipt, so every stored value can say where it came from.
//!
//! # Architecture
//!
//! - **Addressing**: dot-namespaced identifiers with keyword namespace inference
//! - **Extraction**: an ordered rule table first, an optional OpenAI-compatible
//!   model only when the rules come up empty
//! - **Storage**: SQLite ledger / registry / vault with foreign-keyed audit
//!   pointers, soft deletes and per-fact history
//! - **Transport**: CLI, or MCP over stdio / Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML and environment variables
//! - [`db`]: SQLite initialization, schema, migrations and health checks
//! - [`uri`]: identifier parsing, normalization and namespace inference
//! - [`extract`]: rule-based fact extraction
//! - [`inference`]: model endpoint, provider health and arbitration
//! - [`ledger`]: the ledger, registry and vault store
//! - [`query`]: natural-language question answering
//! - [`summon`]: the summoning pipeline tying it all together

pub mod config;
pub mod db;
pub mod extract;
pub mod inference;
pub mod ledger;
pub mod query;
pub mod summon;
pub mod uri;
