//! Data models for the ticketing admin backend.
//!
//! Only the identifying fields are typed. Everything else the backend sends
//! is kept in a `details` map so records round-trip without loss.
//!
//! - `Organizer`, `NewOrganizer`: event organizers
//! - `Participant`, `NewParticipant`: ticket holders
//! - `User`, `NewUser`: staff accounts
//! - `Transaction`, `TransactionTotals`: ticket sales per organizer

pub mod organizer;
pub mod participant;
pub mod transaction;
pub mod user;

pub use organizer::{NewOrganizer, Organizer};
pub use participant::{NewParticipant, Participant};
pub use transaction::{Transaction, TransactionTotals};
pub use user::{NewUser, User};
