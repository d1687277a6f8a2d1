//! Core library for ticketdesk.
//!
//! - `auth`: credential store, session provider, unauthorized signal, redirect handler
//! - `api`: authenticated fetch wrapper and typed dashboard client
//! - `models`: organizers, participants, users, transactions
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, AuthFetch, DashboardClient, FetchOptions, FetchResponse};
pub use auth::{CredentialStore, RedirectHandler, SessionProvider, UnauthorizedBridge};
pub use config::Config;
