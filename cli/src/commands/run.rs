use khaneh_core::HomeController;
use khaneh_core::command::CommandOutcome;

use super::discover::run_discovery;
use crate::terminal::print;

pub async fn run(controller: &HomeController, phrase: &str, json: bool) -> anyhow::Result<()> {
    run_discovery(controller, false).await;
    let outcome: CommandOutcome = controller.execute_command(phrase).await;

    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        print::command_outcome(outcome.success, &outcome.response);
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
