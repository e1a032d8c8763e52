use std::sync::Arc;

use seedling_config::{SettingsService, ShellSettings};
use seedling_engine::EngineHandle;
use seedling_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::admission::AdmissionRequest;
use crate::error::{AppError, AppResult};
use crate::headless;
use crate::list_model::JobFilter;
use crate::shell::{self, Shell, ShellCommand, ShellMessage, ShellSender};

const ENV_LOG_FORMAT: &str = "SEEDLING_LOG_FORMAT";

/// Dependencies required to bootstrap the Seedling shell.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    settings: SettingsService,
    metrics: Metrics,
    request: AdmissionRequest,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment and arguments.
    pub(crate) fn from_env() -> AppResult<Self> {
        let mut logging = LoggingConfig::default();
        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            logging.format = LogFormat::parse(&format);
        }

        let settings =
            ShellSettings::from_env().map_err(|err| AppError::config("settings.from_env", err))?;
        let settings = SettingsService::new(settings)
            .map_err(|err| AppError::config("settings_service.new", err))?;
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let request = AdmissionRequest::from_args(std::env::args().skip(1));

        Ok(Self {
            logging,
            settings,
            metrics,
            request,
        })
    }
}

/// Entry point for the Seedling boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction fails or the engine goes away
/// while the shell is running.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    seedling_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("headless");

    info!("seedling shell bootstrap starting");

    let BootstrapDependencies {
        logging: _,
        settings,
        metrics,
        request,
    } = dependencies;

    let (inbox_tx, inbox_rx) = shell::inbox();
    let (publisher, stream) = seedling_events::channel();
    let (engine, worker) = EngineHandle::spawn(publisher);

    let forwarder = shell::forward_engine_events(stream, inbox_tx.clone());
    let settings_task = shell::forward_settings(settings.watch(), inbox_tx.clone());
    let signals = spawn_signal_listener(inbox_tx.clone())?;

    let host = headless::handles(inbox_tx.clone());
    let mut core = Shell::new(Arc::new(engine), settings, host, metrics.clone());
    for filter in [JobFilter::downloading(), JobFilter::seeding(), JobFilter::paused()] {
        core.add_filter(filter);
    }

    if !request.is_empty()
        && inbox_tx
            .send(ShellMessage::Command(ShellCommand::Admit(request)))
            .is_err()
    {
        warn!("shell inbox closed before startup admission");
    }
    drop(inbox_tx);

    let result = core.run(inbox_rx).await;

    for task in [signals, settings_task, forwarder] {
        if !task.is_finished() {
            task.abort();
        }
    }
    if let Err(err) = worker.await {
        warn!(error = %err, "engine worker join failed");
    }

    match metrics.render() {
        Ok(rendered) => debug!(metrics = %rendered, "final metrics"),
        Err(err) => warn!(error = %err, "metrics render failed"),
    }
    info!("seedling shell stopped");
    result
}

fn spawn_signal_listener(inbox: ShellSender) -> AppResult<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|err| AppError::io("signal.install", err))?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let received = tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| "interrupt"),
            _ = terminate.recv() => Ok("terminate"),
        };
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.map(|()| "interrupt");

        match received {
            Ok(signal) => {
                info!(signal, "shutdown signal received");
                let _ = inbox.send(ShellMessage::Shutdown);
            }
            Err(err) => warn!(error = %err, "signal listener failed"),
        }
    }))
}
