pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod delivery;
pub mod error;
pub mod guide;
pub mod model;
pub mod notify;
pub mod promo;
pub mod session;
pub mod upload;
pub mod usage;

pub use error::ClientError;
