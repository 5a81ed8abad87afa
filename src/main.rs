#![allow(warnings)]

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

mod api;
mod auth;
mod cli;
mod config;
mod push;
mod routing;
mod transport;

use api::ApiClient;
use auth::{AuthStore, User};
use cli::{Cli, Commands, ConfigAction};
use config::Config;
use push::TokenManager;
use routing::{LoggingNavigator, NotificationRouter, Role};
use transport::WsTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("fuelnet-client.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    let cli = Cli::parse();
    info!("Starting fuelnet-client");

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("api_base_url = {}", config.api_base_url);
                println!("ws_url       = {}", config.ws_url());
                println!("mock_mode    = {}", config.mock_mode);
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                let mut config = config;
                config.set_value(&key, &value)?;
                config.save()?;
                println!("{key} = {value}");
                Ok(())
            }
        },
        Commands::Run { token, role, user_id } => run(config, token, role, user_id).await,
    }
}

async fn run(config: Config, token: Option<String>, role: Option<String>, user_id: String) -> Result<()> {
    let auth = Arc::new(AuthStore::open()?);
    let router = NotificationRouter::new(Arc::clone(&auth));
    router.attach_navigation_surface(Arc::new(LoggingNavigator));

    if let Err(err) = auth.rehydrate() {
        warn!("session rehydration failed: {err:#}");
    }

    // A --role flag seeds a session, overriding anything rehydrated.
    if let Some(role) = role {
        let Some(role) = Role::from_wire(&role) else {
            bail!("unknown role '{role}'");
        };
        auth.set_user(User { id: user_id, name: None, role }, token.clone());
    }

    let api = Arc::new(ApiClient::new(config.api_base_url.clone(), Arc::clone(&auth))?);
    let tokens = Arc::new(TokenManager::new(api, Arc::clone(&auth)));
    if config.mock_mode {
        // Mock mode has no real backend to register tokens with.
        info!("mock mode: skipping device token registration");
    } else {
        tokens.watch_auth();
        if auth.current_user().is_some() {
            tokens.register_in_background();
        }
    }

    let Some(token) = token.or_else(|| auth.token()) else {
        bail!("no auth token available; pass --token or log in first");
    };

    let transport = WsTransport::new(router, config.ws_url());
    transport.run(&token).await;
    Ok(())
}
