use clap::Parser;
use hermes::adapters::converter::convert_file;
use hermes::adapters::http_dispatcher::HttpDispatcher;
use hermes::adapters::metrics_handler::MetricsCollector;
use hermes::adapters::sender_handler::{SendRequest, SenderRuntime, SenderState};
use hermes::adapters::translator::InterfaceCompiler;
use hermes::cli::{Cli, Command};
use hermes::config::{watcher::EndpointWatcher, ConfigSource, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let source = ConfigSource::from_cli(&cli);

    match cli.command {
        Command::Receive(_) => receive(source).await,
        Command::Sender(_) => sender(source).await,
        Command::Send { endpoint, .. } => send_once(source, endpoint).await,
        Command::Translate(args) => {
            let settings = source.load()?;
            let compiler = InterfaceCompiler::from_files(
                args.internal,
                args.external,
                &args.internal_spec,
                &args.external_spec,
            )?
            .with_policy(settings.engine);
            compiler.write(args.output.as_deref())?;
            Ok(())
        }
        Command::Convert { input, output } => convert_file(&input, &output),
    }
}

async fn serve(host: &str, port: u16, app: axum::Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn receive(source: ConfigSource) -> anyhow::Result<()> {
    let settings = source.load()?;
    info!(
        "Starting receiver on {}:{}",
        settings.receiver.host, settings.receiver.port
    );

    let app = hermes::create_receiver_app(&settings)?;
    serve(&settings.receiver.host, settings.receiver.port, app).await
}

fn sender_state(source: &ConfigSource, settings: Settings) -> anyhow::Result<SenderState> {
    let dispatcher = HttpDispatcher::new(Duration::from_secs(settings.sender.timeout_seconds))?;
    let runtime = SenderRuntime::from_settings(settings)?;
    Ok(SenderState::new(
        runtime,
        Some(source.clone()),
        Arc::new(dispatcher),
        Arc::new(MetricsCollector::new()?),
    ))
}

async fn sender(source: ConfigSource) -> anyhow::Result<()> {
    let settings = source.load()?;
    let host = settings.sender.host.clone();
    let port = settings.sender.port;
    info!("Starting sender on {}:{}", host, port);

    let state = sender_state(&source, settings)?;

    // Endpoint file changes rebuild the runtime on the tokio runtime
    let handle = tokio::runtime::Handle::current();
    let state_for_watcher = state.clone();
    let _watcher = EndpointWatcher::new(source.watch_paths(), move || {
        let state = state_for_watcher.clone();
        handle.spawn(async move {
            if let Err(e) = state.reload().await {
                error!("Failed to reload configuration: {:#}", e);
            }
        });
    })?;

    let app = hermes::create_sender_app(state).await;
    serve(&host, port, app).await
}

async fn send_once(source: ConfigSource, endpoint_index: usize) -> anyhow::Result<()> {
    let settings = source.load()?;
    let state = sender_state(&source, settings)?;

    let outcome = state
        .send(SendRequest {
            endpoint_index,
            ..SendRequest::default()
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
