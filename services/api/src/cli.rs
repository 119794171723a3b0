use clap::{Args, Parser, Subcommand};

use care_audit::error::AppError;

use crate::demo::{run_demo, run_schedule_preview, DemoArgs, SchedulePreviewArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Care Audit Engine",
    about = "Run the audit scheduling and compliance engine from the command line",
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
    /// Inspect the projected audit calendar for a location
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
    /// Run an end-to-end demo covering scheduling, completion, and rollup
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Print the conflict-free forward calendar without writing anything
    Preview(SchedulePreviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schedule {
            command: ScheduleCommand::Preview(args),
        } => run_schedule_preview(args),
        Command::Demo(args) => run_demo(args),
    }
}
