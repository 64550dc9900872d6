pub mod build_info;
pub mod cli;
pub mod config;
pub mod db;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod transport;
