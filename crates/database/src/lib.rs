//! # Skyfare Database Crate
//!
//! This crate is the data-access and authentication layer of the flight
//! management system. It sits between the presentation layer and the
//! relational store and owns three concerns: the lifecycle of the single
//! shared database handle, validated CRUD over the flight catalog, and the
//! two independent authentication subsystems (administrator and end user).
//!
//! ## Architectural Principles
//!
//! - **Explicit construction:** there is no global singleton. [`Services::new`]
//!   wires one shared connection and two session handles through every
//!   service; the composition root owns the result and passes it by reference.
//! - **One handle, one lock:** the store is reached through exactly one
//!   physical connection guarded by an async mutex. Every public operation
//!   holds the lock for its full duration, so concurrent callers are
//!   serialized, never interleaved.
//! - **Structured results:** every operation returns `Result<T, DbError>`
//!   synchronously. No error escapes as a panic; a failed operation leaves
//!   prior state unchanged.
//! - **Bound parameters only:** caller-supplied values never appear in
//!   statement text.
//!
//! ## Public API
//!
//! - `Services`: the explicitly constructed service set.
//! - `ConnectionManager`: connect / disconnect / liveness of the shared handle.
//! - `FlightRepository`: validated CRUD over the flight catalog.
//! - `AdminAuthService` / `UserAccountService`: credential verification,
//!   registration and session state for the two roles.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod account;
pub mod auth;
pub mod connection;
pub mod error;
pub mod repository;
pub mod services;
pub mod session;

// Re-export the key components to create a clean, public-facing API.
pub use account::UserAccountService;
pub use auth::AdminAuthService;
pub use connection::ConnectionManager;
pub use error::DbError;
pub use repository::FlightRepository;
pub use services::Services;
pub use session::SessionState;
