pub mod app;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod model;
pub mod present;
pub mod ui;

pub use app::App;
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use gateway::{GatewayError, HttpGateway, InMemoryStore, RemoteStore};
