use anyhow::Result;
use clap::Parser;

use artlens::Opts;
use artlens::cli::SubCommandExtend;
use artlens::config::SubCommand;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Add(cmd) => cmd.run(&opts).await,
        SubCommand::Match(cmd) => cmd.run(&opts).await,
        SubCommand::Catalog(cmd) => cmd.run(&opts).await,
        SubCommand::Server(cmd) => cmd.run(&opts).await,
    }
}
