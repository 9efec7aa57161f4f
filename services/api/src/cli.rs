use crate::demo::{run_demo, run_submit, DemoArgs, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use asd_screening::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "ASD Screening Orchestrator",
    about = "Run the ASD screening service, submit questionnaires, or serve mock prediction models",
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
    /// Submit a questionnaire file to the configured prediction models
    Submit(SubmitArgs),
    /// Walk through the screening wizard against local mock models
    Demo(DemoArgs),
    /// Serve a mock prediction API for local development
    MockModels(MockModelsArgs),
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

#[derive(Args, Debug)]
pub(crate) struct MockModelsArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub(crate) host: String,
    #[arg(long, default_value_t = 8000)]
    pub(crate) port: u16,
    /// Models to serve; repeat the flag for several. Defaults to both standard models.
    #[arg(long = "model")]
    pub(crate) models: Vec<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Submit(args) => run_submit(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::MockModels(args) => server::run_mock_models(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["asd-screening-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn mock_models_accepts_repeated_models() {
        let cli = Cli::try_parse_from([
            "asd-screening-api",
            "mock-models",
            "--port",
            "8100",
            "--model",
            "Random Forest",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::MockModels(args)) => {
                assert_eq!(args.port, 8100);
                assert_eq!(args.host, "127.0.0.1");
                assert_eq!(args.models, vec!["Random Forest".to_string()]);
            }
            other => panic!("expected mock-models, got {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_more_than_ten_answers() {
        assert!(Cli::try_parse_from(["asd-screening-api", "demo", "--affirmative", "11"]).is_err());
    }
}
