use clap::{Parser, Subcommand};

#[derive(Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// runs the dispatcher against a live game server
    RunDispatcher {
        #[arg(long, env("SPACETRADERS_TOKEN"))]
        spacetraders_token: String,
        #[arg(long, env("SPACETRADERS_BASE_URL"), default_value = "https://api.spacetraders.io")]
        spacetraders_base_url: String,
        #[arg(long, env("SPACETRADERS_HOME_SYSTEM"))]
        spacetraders_home_system: String,
    },
}
