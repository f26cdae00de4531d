//! linegpt core library — config, LINE channel, completion client, routing,
//! and the webhook gateway used by the CLI binary.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod routing;
