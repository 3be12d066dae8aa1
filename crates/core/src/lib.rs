pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod rate_limit;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use cache::*;
pub use clock::*;
pub use config::*;
pub use context::*;
pub use rate_limit::*;
pub use store::*;
pub use types::*;
