use std::sync::Arc;
use tracing::{error, info};

use livecraft_common::models::Collection;
use livecraft_common::traits::TtsPlayer;
use livecraft_core::eventbus::EventBus;
use livecraft_core::platforms::{HttpTtsPlayer, LiveEventSource, LogTtsPlayer, WebSocketActionSink};
use livecraft_core::services::{ActionDispatcher, RuleEvaluator, RulePipelineService, RuleRegistry};
use livecraft_core::{Database, Error, PipelineConfig};

/// Runs the whole pipeline until Ctrl-C.
pub async fn run_server(config: PipelineConfig) -> Result<(), Error> {
    config.validate()?;

    // 1) Database
    let db = Database::new(&config.database_url).await?;
    db.migrate().await?;

    // 2) Event bus and outbound effects
    let event_bus = Arc::new(EventBus::new());
    let (action_sink, writer_handle) = WebSocketActionSink::spawn(
        &config.action_socket_url,
        config.reconnect,
        event_bus.shutdown_rx.clone(),
    );
    let tts: Arc<dyn TtsPlayer> = match &config.tts_url {
        Some(url) => {
            info!("TTS requests go to {}", url);
            Arc::new(HttpTtsPlayer::new(url))
        }
        None => {
            info!("No TTS endpoint configured; speech is logged only.");
            Arc::new(LogTtsPlayer)
        }
    };

    let dispatcher = ActionDispatcher::new(
        Arc::new(db.collection(Collection::Actions, Some(event_bus.clone()))),
        Arc::new(action_sink),
        tts,
    )
    .with_event_bus(event_bus.clone())
    .with_validation(config.field_validation);
    info!("Action field validation: {}", config.field_validation);

    // 3) Rule pipeline
    let service = Arc::new(RulePipelineService::new(
        db.clone(),
        RuleEvaluator::new(Arc::new(RuleRegistry::with_defaults())),
        Arc::new(dispatcher),
        event_bus.clone(),
    ));
    let pipeline_handle = tokio::spawn(service.start());

    // 4) Live source
    let source = LiveEventSource::new(&config.live_source_url, config.reconnect, event_bus.clone());
    let source_handle = tokio::spawn(async move {
        if let Err(e) = source.start_loop().await {
            error!("Live source stopped with error: {:?}", e);
        }
    });

    // 5) Handle Ctrl-C to signal shutdown
    let eb_for_ctrlc = event_bus.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error waiting for Ctrl-C: {:?}", e);
            return;
        }
        info!("Ctrl-C detected; shutting down...");
        eb_for_ctrlc.shutdown();
    });

    let (pipeline, source, writer) = tokio::join!(pipeline_handle, source_handle, writer_handle);
    for (name, res) in [("pipeline", pipeline), ("live source", source), ("action socket", writer)] {
        if let Err(e) = res {
            error!("{} task failed: {:?}", name, e);
        }
    }

    info!("Server shutdown complete.");
    Ok(())
}
