use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod dispatch;
mod parsing;
mod utils;
mod web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("rfam_batch=debug,info")
    } else {
        EnvFilter::new("rfam_batch=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Validate(args) => {
            cli::validate::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Submit(args) => {
            cli::submit::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Status(args) => {
            cli::submit::run_status(args, cli.format)?;
        }
        cli::Commands::Result(args) => {
            cli::result::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Parse(args) => {
            cli::result::run_parse(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args)?;
        }
    }

    Ok(())
}
