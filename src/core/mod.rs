pub mod aggregator;
pub mod committer;
pub mod conflict;
pub mod engine;
pub mod entity;
pub mod mirror;
pub mod range;
pub mod validator;
pub mod workflow;

pub use crate::domain::ports::{CatalogStore, ConfigProvider};
pub use crate::utils::error::Result;
