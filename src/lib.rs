pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod push;
pub mod routing;
pub mod transport;
