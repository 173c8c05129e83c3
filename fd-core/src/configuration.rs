use crate::cli_args::Commands;
use fd_domain::SystemSymbol;

#[derive(Debug, Clone)]
pub struct DispatcherConfiguration {
    pub token: String,
    pub base_url: String,
    pub home_system: SystemSymbol,
}

impl DispatcherConfiguration {
    pub fn new(commands: Commands) -> Self {
        match commands {
            Commands::RunDispatcher {
                spacetraders_token,
                spacetraders_base_url,
                spacetraders_home_system,
            } => Self {
                token: spacetraders_token,
                base_url: spacetraders_base_url,
                home_system: SystemSymbol(spacetraders_home_system),
            },
        }
    }
}
