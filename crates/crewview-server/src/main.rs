use clap::Parser;
use crewview_server::cli::Args;
use tracing::{error, info};

fn main() {
    let args = Args::parse();
    crewview_server::init_logging(args.verbose, args.log_json);
    info!(event = "server.start_started");

    let exit_code = match run(&args) {
        Ok(()) => {
            info!(event = "server.start_completed");
            0
        }
        Err(e) => {
            error!(event = "server.start_failed", error = %e);
            eprintln!("crewview: {}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => crewview_server::load_config_from(path)?,
        None => crewview_server::load_server_config()?,
    };
    let config = args.apply(config);
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { crewview_server::run_server(config).await })?;
    Ok(())
}
