//! Aeroguard admin server

pub mod error_handler;
pub mod handlers;
pub mod models;
pub mod router;

pub use router::create_router;
