pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{ServerBuilder, SessmemServer, build_app};
