//! # Customer Service
//!
//! Customer records, password login and the `/verify` endpoint the order
//! service authenticates against.
//!
//! Sessions are opaque random tokens with an expiry; passwords are salted
//! SHA-256 digests compared in constant time.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod password;
pub mod routes;
pub mod service;

pub use auth::SessionAuthenticator;
pub use config::Config;
pub use routes::build_router;
pub use service::{CustomerService, CustomerUpdate, LoginResponse, NewCustomer, VerifiedCustomer};
