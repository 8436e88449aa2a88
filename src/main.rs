use anyhow::{Context, Result};
use autobuffer::{
    cli,
    notify::{ConsoleNotifier, Notifier},
    scheduler::PlaybackScheduler,
    session::TransferSession,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = cli::Cli::parse_args();
    let json = args.json;
    let config = args.into_config();
    let url = config.url.clone();

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let mut scheduler = PlaybackScheduler::new(&config, notifier);

    let mut session = TransferSession::open(config)
        .await
        .context("Error creating video stream")?;
    let outcome = scheduler.run(&mut session).await;
    let closed = session.close().await;

    let report = match outcome {
        Ok(report) => report,
        Err(err) => {
            if let Err(close_err) = closed {
                eprintln!("{close_err}");
            }
            return Err(err).with_context(|| format!("Error streaming {url}"));
        }
    };
    closed.context("Error closing video stream")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
