//! REST client for the ticketing admin backend.
//!
//! `AuthFetch` is the authenticated fetch wrapper every request goes through.
//! `DashboardClient` layers typed calls for organizers, participants, users
//! and transactions on top of it.

pub mod client;
pub mod error;
pub mod fetch;

pub use client::{DashboardClient, DashboardSummary};
pub use error::ApiError;
pub use fetch::{AuthFetch, FetchOptions, FetchResponse, NETWORK_ERROR_MESSAGE};
