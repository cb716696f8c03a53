// File persistence: atomic JSON helpers and the preferences record
pub mod json_ops;
pub mod preferences;

pub use json_ops::*;
pub use preferences::*;
