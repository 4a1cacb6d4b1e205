pub mod plans;
pub mod runtime;

mod error;

pub use crate::error::RuntimeError;
pub use crate::runtime::{execute, VidloadRuntime};
