// Data models (structs)
pub mod job;
pub mod job_config;
pub mod preferences;

pub use job::*;
pub use job_config::*;
pub use preferences::*;
