mod config;
mod constants;
mod credentials;
mod outcome;
mod plan;
mod threshold;

pub use config::*;
pub use constants::*;
pub use credentials::*;
pub use outcome::*;
pub use plan::*;
pub use threshold::*;
