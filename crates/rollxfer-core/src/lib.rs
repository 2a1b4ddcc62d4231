pub mod channel;
pub mod config;
pub mod decoder;
pub mod enumeration;
pub mod errors;
pub mod orchestrator;
pub mod plan;
pub mod profile;
pub mod roll;
pub mod selection;
pub mod sizing;
pub mod transfer_script;
