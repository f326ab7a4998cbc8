pub mod atomic_io;
pub mod config;
pub mod errors;
pub mod metrics_recorder;
pub mod metrics_report;
pub mod metrics_store;
pub mod metrics_types;
pub mod tool_call;
