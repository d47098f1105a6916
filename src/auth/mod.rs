//! # Authentication Module
//!
//! Session resolution for the console: bearer token storage and decoding,
//! identity derivation from claims, model profile reconciliation, and the
//! capability checks every route relies on.

pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod session;
pub mod store;

pub use session::{SessionResolver, SessionSnapshot};
