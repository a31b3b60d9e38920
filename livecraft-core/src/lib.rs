// src/lib.rs

pub mod db;
pub mod repositories;
pub mod eventbus;
pub mod services;
pub mod platforms;
pub mod config;
pub mod test_utils;

pub use db::Database;
pub use config::PipelineConfig;
pub use livecraft_common::error::Error;
