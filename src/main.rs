use std::process;

use clap::Parser;
use ouman_bridge::{
    cli::Args, config::logger::LoggerConfig, core::app, logger::LoggerManager, print_error,
};
use tracing::{debug, error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let logger_manager = LoggerManager::new(LoggerConfig::from_cli(args.debug, args.log_format))
        .unwrap_or_else(|e| {
            print_error!("Failed to setup Log Manager: {}", e);
            process::exit(1);
        });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    info!("Starting ouman-bridge version {}...", env!("CARGO_PKG_VERSION"));
    debug!("{:?}", args);

    match app::run(&args).await {
        Ok(report) => debug!("{:?}", report),
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}
