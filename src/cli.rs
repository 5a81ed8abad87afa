use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fuelnet-client", about = "Headless client for the FuelNet logistics network")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the backend and route incoming notifications
    Run {
        /// Auth token; falls back to the persisted session
        #[arg(long)]
        token: Option<String>,
        /// Seed a session with this role (DRIVER, SGL_DRIVER, DBS_OPERATOR, MS_OPERATOR, EIC)
        #[arg(long)]
        role: Option<String>,
        /// User id for the seeded session
        #[arg(long, default_value = "local")]
        user_id: String,
    },
    /// Inspect or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Set a configuration value and persist it
    Set { key: String, value: String },
}
