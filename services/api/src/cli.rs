use crate::demo::{run_demo, run_rebalance, DemoArgs, RebalanceArgs};
use crate::server;
use care_navigation::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Care Navigation Service",
    about = "Run or demonstrate navigator matching, provider ranking, and caseload balancing",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score, assign, and rank a batch of sample beneficiaries against the demo roster
    Demo(DemoArgs),
    /// Run a single rebalancing pass over a seeded, lopsided caseload
    Rebalance(RebalanceArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the rebalancing interval in seconds (0 disables the worker)
    #[arg(long)]
    pub(crate) rebalance_interval_secs: Option<u64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Rebalance(args) => run_rebalance(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["care-navigation-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_interval_override() {
        let cli = Cli::try_parse_from([
            "care-navigation-api",
            "serve",
            "--port",
            "8080",
            "--rebalance-interval-secs",
            "0",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.rebalance_interval_secs, Some(0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
