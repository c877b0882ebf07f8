mod feasibility;
mod plan;
mod run;
mod spec;

use crate::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::execute(args).await,
        Command::Plan(args) => plan::execute(args),
        Command::Feasibility(args) => feasibility::execute(args),
        Command::Spec(args) => spec::execute(args),
    }
}
