//! Insurance advisory backend core.
//!
//! The centerpiece is the schema-driven product query engine: product
//! categories map to physical tables discovered at runtime, and user-supplied
//! filter expressions are compiled into parameterized SQL against whatever
//! column set those tables currently have.
//!
//! ## Call chain
//!
//! ```text
//! request -> SchemaCatalog (resolve fields)
//!         -> filter compiler (build predicates)
//!         -> QueryExecutor (count + fetch)
//!         -> translate (localize output)
//!         -> response
//! ```
//!
//! Everything else (auth, experiment assignment, goals, policy lists,
//! reference lookups) is CRUD glue over the same injected `PgPool`.

// Core error handling
pub mod error;

// Environment-driven configuration
pub mod config;

// Schema-driven product query engine
pub mod catalog;
pub mod filter;
pub mod products;
pub mod query;
pub mod translate;

// Participant-facing services
pub mod auth;
pub mod experiment;
pub mod goals;
pub mod policies;

// Static reference data (medical / pension tables)
pub mod reference;

pub use error::{AdvisorError, Result};
