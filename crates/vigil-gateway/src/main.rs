use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{error, info, warn};

use vigil_channels::{ChatAdapter, ChannelManager, MailAdapter};
use vigil_core::VigilConfig;
use vigil_executor::Executor;
use vigil_llm::{HttpLlmProvider, LlmProvider};
use vigil_memory::{init_db, MemoryManager, SessionManager};
use vigil_pipeline::{Pipeline, PipelineDeps};
use vigil_refiner::Refiner;
use vigil_reporter::ArtifactGenerator;
use vigil_state::StateStore;
use vigil_understanding::UnderstandingAgent;
use vigil_validators::{CompositeMode, CompositeValidator, FileExistsValidator, Validator};

const AGENT_CLI_BIN_NAME: &str = "agent-cli";
const CHANNEL_POLL_INTERVAL: Duration = Duration::from_secs(3);
const CHANNEL_RECEIVE_LIMIT: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info".into()),
        )
        .init();

    let config_path = std::env::var("VIGIL_CONFIG").ok();
    let config = VigilConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        VigilConfig::default()
    });

    if let Err(e) = run(config).await {
        error!(error = %e, "fatal startup error");
        return Err(e);
    }
    Ok(())
}

async fn run(config: VigilConfig) -> anyhow::Result<()> {
    if let Some(parent) = std::path::Path::new(&config.storage.state_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = std::path::Path::new(&config.storage.memory_db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let state = Arc::new(StateStore::load(&config.storage.state_path));

    let memory_conn = rusqlite::Connection::open(&config.storage.memory_db_path)?;
    init_db(&memory_conn)?;
    let memory = Arc::new(MemoryManager::new(memory_conn));

    let session_conn = rusqlite::Connection::open(&config.storage.memory_db_path)?;
    init_db(&session_conn)?;
    let sessions = Arc::new(SessionManager::new(session_conn));

    let llm: Arc<dyn LlmProvider> = Arc::new(HttpLlmProvider::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.timeout_secs,
        config.llm.max_retries,
    ));

    let understanding = UnderstandingAgent::new(llm.clone(), config.llm.model.clone());
    let refiner = Refiner::new(llm.clone(), config.llm.model.clone());

    let executor = Executor::new(
        config.executor.cli_path.clone(),
        AGENT_CLI_BIN_NAME,
        config.executor.shell_path.clone(),
        config.executor.work_dir.clone(),
    );

    let work_dir = config
        .executor
        .work_dir
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let validators: Vec<Box<dyn Validator>> = vec![Box::new(CompositeValidator::new(
        "executor-output",
        CompositeMode::Any,
        vec![Box::new(FileExistsValidator::new(
            "changed-files-exist",
            work_dir.clone(),
            Vec::new(),
        ))],
    ))];

    let artifacts = ArtifactGenerator::new(config.storage.reports_dir.clone());

    let mut channel_manager = ChannelManager::new();
    if let Some(chat_cfg) = &config.channels.chat {
        channel_manager.register(Box::new(ChatAdapter::new(
            chat_cfg.base_url.clone(),
            chat_cfg.bot_token.clone(),
            chat_cfg.poll_timeout_secs,
            chat_cfg.allow_list.clone(),
        )));
    }
    if let Some(mail_cfg) = &config.channels.mail {
        channel_manager.register(Box::new(MailAdapter::new(
            mail_cfg.imap_host.clone(),
            mail_cfg.imap_port,
            mail_cfg.smtp_host.clone(),
            mail_cfg.smtp_port,
            mail_cfg.username.clone(),
            mail_cfg.password.clone(),
            mail_cfg.subject_prefix.clone(),
        )));
    }
    channel_manager.connect_all().await;
    let channels = Arc::new(AsyncMutex::new(channel_manager));

    let skills = vigil_pipeline::skills::SkillRegistry::new();
    skills.register(Arc::new(vigil_pipeline::skills::CalculatorSkill));
    skills.register(Arc::new(vigil_pipeline::skills::FileSearchSkill));
    skills.register(Arc::new(vigil_pipeline::skills::SystemInfoSkill));

    let pipeline = Arc::new(Pipeline::new(PipelineDeps {
        state: state.clone(),
        sessions,
        memory,
        understanding,
        refiner,
        executor,
        validators,
        artifacts,
        channels: channels.clone(),
        skills,
        config: config.pipeline.clone(),
        heartbeat_secs: config.supervisor.heartbeat_interval_secs,
        enable_notification: config.supervisor.enable_notification,
        work_dir,
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_handle = tokio::spawn(poll_channels(channels.clone(), pipeline.clone(), shutdown_rx.clone()));
    let process_handle = tokio::spawn(process_tasks(pipeline.clone(), shutdown_rx.clone()));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight work");
    let _ = shutdown_tx.send(true);

    let _ = poll_handle.await;
    let _ = process_handle.await;

    if let Err(e) = state.snapshot() {
        error!(error = %e, "final state snapshot failed");
    }
    channels.lock().await.disconnect_all().await;

    info!("vigil gateway shut down cleanly");
    Ok(())
}

async fn poll_channels(
    channels: Arc<AsyncMutex<ChannelManager>>,
    pipeline: Arc<Pipeline>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(CHANNEL_POLL_INTERVAL) => {
                let messages = channels.lock().await.receive_all(CHANNEL_RECEIVE_LIMIT).await;
                for (channel_name, message) in messages {
                    let id = message.id.clone();
                    pipeline.ingest(message);
                    let mut guard = channels.lock().await;
                    if let Some(channel) = guard.get_mut(&channel_name) {
                        let _ = channel.mark_processed(&id).await;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn process_tasks(pipeline: Arc<Pipeline>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let processed = pipeline.run_once().await;
        if !processed {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(500)) => {}
                _ = shutdown.changed() => {}
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
