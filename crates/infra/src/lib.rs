//! Infrastructure layer: event stores, the wallet service, configuration.

pub mod config;
pub mod event_store;
pub mod wallet_service;


pub use config::{AppConfig, ConfigLoadError, LogFormat, StoreConfig};
pub use wallet_service::{ServiceError, WalletService};
