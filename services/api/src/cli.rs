use crate::commands::{
    run_forms_list, run_report_export, run_report_preview, DataArgs, ExportArgs, FormsListArgs,
    ReportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use forms_report::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "forms-report",
    about = "Query, preview and export submitted compliance forms",
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
    /// Browse submitted forms
    Forms {
        #[command(subcommand)]
        command: FormsCommand,
    },
    /// Preview or export a registered report
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FormsCommand {
    /// List one page of submitted forms
    List(FormsListArgs),
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Print the capped preview as JSON
    Preview(ReportArgs),
    /// Render the report as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Forms {
            command: FormsCommand::List(args),
        } => run_forms_list(args),
        Command::Report {
            command: ReportCommand::Preview(args),
        } => run_report_preview(args),
        Command::Report {
            command: ReportCommand::Export(args),
        } => run_report_export(args),
    }
}
