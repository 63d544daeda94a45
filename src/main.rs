mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    collrun::logger::init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            if !cli::run(args).await? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
