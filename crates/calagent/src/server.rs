use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use calagent_llm::{LlmProvider, OpenAiCompatibleProvider};
use chrono_tz::Tz;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::Processor;
use crate::calendar::{CalendarStore, GoogleCalendarStore, InMemoryCalendarStore};
use crate::config::{CalendarBackend, Settings};
use crate::error::{CoreError, CoreResult};
use crate::tools::ToolExecutor;

pub mod chat;
pub mod error;
pub mod openapi;
pub mod tools;

pub struct ServerState {
    pub(crate) processor: Processor,
    pub(crate) timezone: Tz,
    pub(crate) event_channel_capacity: usize,
}

impl ServerState {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn CalendarStore>,
        settings: &Settings,
    ) -> CoreResult<Self> {
        let executor = ToolExecutor::new(
            store,
            settings.agent.stats_window_days,
            settings.agent.top_attendees,
        );
        Ok(Self {
            processor: Processor::new(llm, Arc::new(executor), settings.processor_config()),
            timezone: settings.timezone()?,
            event_channel_capacity: settings.agent.event_channel_capacity.max(1),
        })
    }

    /// State wired to the configured model service and calendar backend.
    pub fn from_settings(settings: &Settings) -> CoreResult<Self> {
        let llm = OpenAiCompatibleProvider::new(settings.llm.clone())?;
        let store: Arc<dyn CalendarStore> = match settings.calendar.backend {
            CalendarBackend::Google => Arc::new(GoogleCalendarStore::new(
                settings.calendar.google_base_url.clone(),
                settings.calendar.calendar_id.clone(),
                settings.timezone()?,
            )),
            CalendarBackend::Memory => Arc::new(InMemoryCalendarStore::new()),
        };
        Self::new(Arc::new(llm), store, settings)
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat))
        .route("/api/tools", get(tools::list_tools))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Server {
    pub async fn start(bind_addr: &str, state: Arc<ServerState>) -> CoreResult<Self> {
        let app = router(state);
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|error| CoreError::Config(format!("failed to bind {bind_addr}: {error}")))?;
        let addr = listener
            .local_addr()
            .map_err(|error| CoreError::Internal(error.to_string()))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!(error = %error, "server stopped with error");
            }
        });
        tracing::info!(%addr, "listening");

        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> CoreResult<()> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| CoreError::Internal("failed to send server shutdown signal".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Server is up", body = String))
)]
pub(crate) async fn health() -> &'static str {
    "ok"
}
