//! Math Resolver - answers mathematics questions read from stdin.

use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use math_resolver::app::{App, AppError, InputLine, OutputLine};
use math_resolver::config::ConfigLoader;
use math_resolver::workflow::ResolutionEnvelope;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run() -> Result<(), AppError> {
    let loader = ConfigLoader::new();
    let config = loader.load()?;
    if let Some(path) = loader.find_config_file() {
        tracing::info!(path = %path.display(), "Using config file");
    }

    let app = App::from_config(&config).await?;
    tracing::info!("Ready; reading questions from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut last: Option<(String, ResolutionEnvelope)> = None;

    while let Some(line) = lines.next_line().await? {
        let output = match InputLine::parse(&line) {
            Ok(InputLine::Blank) => continue,
            Ok(InputLine::Question(question)) => match app.answer(&question).await? {
                OutputLine::Resolved(envelope) => {
                    last = Some((question, envelope.clone()));
                    OutputLine::Resolved(envelope)
                }
                other => other,
            },
            Ok(InputLine::Rate { rating, comment }) => match &last {
                Some((question, envelope)) => {
                    match app.rate(question, envelope, rating, comment).await {
                        Ok(entry) => OutputLine::FeedbackRecorded { entry },
                        Err(e) => OutputLine::Error {
                            message: e.to_string(),
                        },
                    }
                }
                None => OutputLine::Error {
                    message: "No answer to rate yet".to_string(),
                },
            },
            Ok(InputLine::Search(query)) => app.search_catalog(&query),
            Ok(InputLine::Problem(problem_id)) => app.problem_details(&problem_id),
            Ok(InputLine::Topics) => app.topics(),
            Ok(InputLine::FeedbackStats) => app.feedback_stats().await,
            Err(e) => OutputLine::Error {
                message: e.to_string(),
            },
        };

        let json = serde_json::to_string(&output)?;
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "math-resolver stopped");
            ExitCode::FAILURE
        }
    }
}
