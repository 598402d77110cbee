//! Server lifecycle: wiring, startup and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::routes::create_router;
use crate::cli::handlers::MigrateCommandHandler;
use crate::config::{Environment, Settings};
use crate::db::establish_async_connection_pool;
use crate::error::{AppError, AppResult};
use crate::external::client::build_http_client;
use crate::metrics;
use crate::repositories::Repositories;
use crate::services::Services;
use crate::services::notifications::{ProviderClient, SesClient, SinchClient};
use crate::state::AppState;
use crate::tasks::{
    CronScheduler, LocalTaskQueue, RetryPolicy, SweepInboundKeywordsTask, Task, TaskExecutor,
    TaskRegistry, spawn_workers,
};
use crate::utils::Encryptor;

pub struct Server {
    settings: Settings,
}

/// Background machinery stopped on shutdown.
struct Background {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    scheduler: Option<CronScheduler>,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Runs until Ctrl+C or SIGTERM, then drains workers and stops the
    /// scheduler.
    pub async fn run(self) -> AppResult<()> {
        let settings = &self.settings;
        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );
        tracing::info!(
            host = %settings.server.host,
            port = settings.server.port,
            request_timeout = settings.server.request_timeout,
            max_connections = settings.database.max_connections,
            tasks_enabled = settings.tasks.enabled,
            metrics_enabled = settings.metrics.enabled,
            "Configuration loaded"
        );

        let metrics_handle = if settings.metrics.enabled {
            Some(metrics::install()?)
        } else {
            None
        };

        if settings.database.auto_migrate {
            MigrateCommandHandler::new(settings.clone())
                .execute(false, None)
                .await?;
        }

        tracing::info!("Initializing database connection pool...");
        let pool = establish_async_connection_pool(&settings.database).await?;
        let repos = Repositories::postgres(pool.clone());

        let clients = build_provider_clients(settings)?;
        tracing::info!(
            providers = ?clients.iter().map(|c| c.identifier()).collect::<Vec<_>>(),
            "Provider clients configured"
        );

        let encryptor = Encryptor::from_hex(&settings.security.encryption_key)?;
        let (queue, receiver) = LocalTaskQueue::channel();
        let services = Services::new(
            repos,
            clients,
            encryptor,
            Arc::new(queue),
            &settings.retention,
        )?;

        let background = self.start_background(services.clone(), receiver).await?;

        let state = AppState::new(services, Some(pool), metrics_handle);
        let router = create_router(state, Duration::from_secs(settings.server.request_timeout));

        let address = settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            AppError::Internal {
                source: anyhow::anyhow!("Failed to bind to {}: {}", address, e),
            }
        })?;
        tracing::info!(address = %address, "Server listening");

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        background.shutdown().await;
        served.map_err(|e| AppError::Internal {
            source: anyhow::Error::new(e),
        })?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    async fn start_background(
        &self,
        services: Services,
        receiver: crate::tasks::TaskReceiver,
    ) -> AppResult<Background> {
        let tasks = &self.settings.tasks;
        let cancel = CancellationToken::new();
        let executor = Arc::new(TaskExecutor::new(
            Arc::new(TaskRegistry::with_builtin()),
            services,
            RetryPolicy::from(tasks),
            cancel.clone(),
        ));

        if !tasks.enabled {
            tracing::warn!("Task workers disabled; queued deliveries will not be sent");
            return Ok(Background {
                cancel,
                workers: Vec::new(),
                scheduler: None,
            });
        }

        let workers = spawn_workers(receiver, Arc::clone(&executor), tasks.worker_count, cancel.clone());
        tracing::info!(count = workers.len(), "Task workers started");

        let scheduler = CronScheduler::new(executor).await?;
        scheduler
            .schedule(
                &tasks.retention_sweep_cron,
                SweepInboundKeywordsTask::task_type(),
                serde_json::json!({}),
            )
            .await?;
        scheduler.start().await?;

        Ok(Background {
            cancel,
            workers,
            scheduler: Some(scheduler),
        })
    }
}

impl Background {
    async fn shutdown(self) {
        if let Some(scheduler) = &self.scheduler
            && let Err(e) = scheduler.stop().await
        {
            tracing::warn!(error = %e, "Scheduler did not stop cleanly");
        }
        self.cancel.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "Task worker ended abnormally");
            }
        }
    }
}

/// One client per configured provider, sharing a single HTTP client.
fn build_provider_clients(settings: &Settings) -> AppResult<Vec<Arc<dyn ProviderClient>>> {
    let providers = &settings.providers;
    let http = build_http_client(
        Duration::from_secs(providers.request_timeout),
        Duration::from_secs(providers.connect_timeout),
    )?;

    let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();
    if let Some(ses) = &providers.ses {
        clients.push(Arc::new(SesClient::new(http.clone(), ses.clone())?));
    }
    if let Some(sinch) = &providers.sinch {
        clients.push(Arc::new(SinchClient::new(
            http,
            sinch.clone(),
            providers.callback_host.clone(),
        )?));
    }
    if clients.is_empty() {
        tracing::warn!("No provider clients configured; every send will fail");
    }
    Ok(clients)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
