pub mod config;
pub mod contracts;
pub mod db;
pub mod error;
pub mod domain {
    pub mod event;
    pub mod participant;
    pub mod token;
}
pub mod reconcile;
pub mod repo;
pub mod seed;
pub mod service;
pub mod storage;

pub use config::AppConfig;
pub use error::{NoFlakeError, Result};
