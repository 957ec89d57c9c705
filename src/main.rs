use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};

use cooked_placeholders::config::Settings;
use cooked_placeholders::dom::Document;
use cooked_placeholders::host::{run_event_loop, HostEvent, PlaceholderRuntime};
use cooked_placeholders::metrics::encode_metrics;
use cooked_placeholders::placeholder::{PostIdentifier, PostMetadata};
use cooked_placeholders::store::{create_store_backend, ValueStore};
use cooked_placeholders::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[clap(
    version,
    about = "Render a post fixture with its placeholders filled in",
    arg_required_else_help(true)
)]
struct Options {
    /// JSON fixture of the rendered post
    #[clap(long, value_name = "PATH")]
    fixture: PathBuf,

    #[clap(long, default_value_t = 1)]
    topic_id: u64,

    #[clap(long, default_value_t = 1)]
    post_id: u64,

    /// Reader input to replay, in order.
    ///
    /// Each entry is delivered to the control bound to KEY as a change event.
    #[clap(long = "set", value_name = "KEY=VALUE", value_parser(parse_assignment))]
    set: Vec<(String, String)>,

    /// Print the resulting fixture JSON instead of HTML
    #[clap(long)]
    json: bool,

    /// Print Prometheus metrics after the output
    #[clap(long)]
    metrics: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::parse();

    // Load configuration
    let settings = Settings::new()?;
    init_tracing(&settings.log)?;
    tracing::info!("Configuration loaded");

    // Create value store and runtime
    let backend = create_store_backend(&settings.store);
    let store = ValueStore::new(backend, &settings.store)?;
    let runtime = PlaceholderRuntime::from_settings(&settings, store)?;
    runtime.startup();

    let raw = tokio::fs::read_to_string(&options.fixture)
        .await
        .with_context(|| format!("reading fixture {}", options.fixture.display()))?;
    let document = Document::from_json(&raw)?;

    let metadata = PostMetadata {
        topic_id: options.topic_id,
        post_id: options.post_id,
    };
    let post = PostIdentifier::new(metadata);

    // Start the event loop
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (events_tx, events_rx) = mpsc::channel(64);
    let driver = tokio::spawn(run_event_loop(runtime, events_rx, shutdown_rx));
    tokio::spawn(shutdown_signal_handler(shutdown_tx));

    events_tx
        .send(HostEvent::Render {
            metadata: Some(metadata),
            document,
        })
        .await?;

    for (key, value) in options.set {
        events_tx
            .send(HostEvent::Input {
                post: post.clone(),
                key,
                value,
            })
            .await?;
    }
    drop(events_tx);

    let runtime = driver.await?;
    let document = runtime
        .document(&post)
        .ok_or_else(|| anyhow!("post {} was not rendered", post))?;

    if options.json {
        let fixture = document.to_fixture(document.root());
        println!("{}", serde_json::to_string_pretty(&fixture)?);
    } else {
        println!("{}", document.to_html(document.root()));
    }

    if options.metrics {
        print!("{}", encode_metrics()?);
    }

    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        // Keep the sender alive so the event loop is not told to stop
        std::future::pending::<()>().await;
    }

    tracing::info!("Received Ctrl+C, stopping event loop");
    let _ = shutdown_tx.send(());
}
