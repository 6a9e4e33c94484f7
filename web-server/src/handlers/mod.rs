pub mod auth;
pub mod experiment;
pub mod goals;
pub mod health;
pub mod policies;
pub mod products;
pub mod reference;
