pub mod configuration;
pub mod database;
pub mod server;
