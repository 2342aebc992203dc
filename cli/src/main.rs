mod commands;
mod terminal;

use commands::{CommandLine, Commands, devices, discover, run};
use khaneh_core::HomeController;
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    logging::init_logging(commands.verbose);

    let config = commands.config()?;
    let controller = HomeController::new(&config);

    match commands.command {
        Commands::Discover { force } => discover::discover(&controller, force, commands.json).await,
        Commands::Devices => devices::devices(&controller, commands.json).await,
        Commands::Run { ref phrase } => run::run(&controller, phrase, commands.json).await,
    }
}
