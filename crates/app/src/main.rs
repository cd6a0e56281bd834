mod cli;
mod logging;
mod state;
mod version;

use clap::{Parser, Subcommand};
use cli::args::Args;
use cli::op::{Op, OpContext};
use cli::{Download, Init, Upload, Version};

command_enum! {
    (Download, Download),
    (Init, Init),
    (Upload, Upload),
    (Version, Version),
}

/// Log level from the flag, then the initialized config, then `warn`
fn log_level(args: &Args) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    state::AppState::load(args.config_path.clone())
        .map(|state| state.config.log_level)
        .unwrap_or_else(|_| "warn".to_string())
}

async fn run(args: Args) -> anyhow::Result<OpOutput> {
    let ctx = OpContext::new(args.config_path.clone());
    Ok(args.command.execute(&ctx).await?)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let guard = logging::init_logging(&log_level(&args));

    let code = match run(args).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // flush buffered log lines before exiting
    drop(guard);
    std::process::exit(code);
}
