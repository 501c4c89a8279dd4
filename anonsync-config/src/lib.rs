//! Configuration types and loading for the anonsync services.
//!
//! Configuration is loaded hierarchically: a `base` file, an
//! environment-specific file, and `APP_`-prefixed environment variable
//! overrides, in that order. The shared types validate themselves before the
//! services use them.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config};
