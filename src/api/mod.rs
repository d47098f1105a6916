//! # Backend API Module
//!
//! Typed access to the agency REST API (accounts, models, jobs, expenses).
//! The session layer depends only on the [`AgencyBackend`] trait so the
//! HTTP client can be swapped for a fake.

pub mod backend;
pub mod client;
pub mod error;
pub mod models;

pub use backend::AgencyBackend;
pub use client::ApiClient;
pub use error::ApiError;
