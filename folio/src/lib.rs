pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod media;
pub mod query;
pub mod response;
pub mod schema;
pub mod service;
pub mod works;

pub use config::Config;
pub use error::{Error, Result};
