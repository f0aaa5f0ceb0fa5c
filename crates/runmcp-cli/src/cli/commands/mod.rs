pub mod allowlist;
pub mod org;
pub mod scan;

use super::args::{Cli, Command, ExperimentalCommand};

pub const EXIT_SUCCESS: i32 = 0;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match &cli.cmd {
        Command::Scan(_) => scan::run(&cli).await,
        Command::Experimental(args) => match &args.cmd {
            ExperimentalCommand::Allowlist(allowlist_args) => {
                allowlist::run(&cli, allowlist_args)
            }
            ExperimentalCommand::Inspect | ExperimentalCommand::Proxy
            | ExperimentalCommand::DeepScan => {
                println!(
                    "This command is under construction. Thanks for your interest. \
Please let Frenchie know if this would be useful for you!"
                );
                Ok(EXIT_SUCCESS)
            }
        },
        Command::Org(org_args) => org::run(&cli, org_args),
    }
}
