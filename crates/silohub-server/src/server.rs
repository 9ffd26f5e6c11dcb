//! Application state, router and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use silohub_backend::{ProvisioningBackend, SimulatedBackend};
use silohub_controller::{
    ChangeFeedConsumer, DeletionOrchestrator, ProvisioningOrchestrator, QueryService,
    StackTemplate, StatusReconciler,
};
use silohub_core::ChangeFeed;
use silohub_registry::{EventedRegistry, InMemoryRegistry, TenantRegistry};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::routes;

/// Shared state behind every handler.
pub struct AppState {
    pub registry: Arc<dyn TenantRegistry>,
    pub backend: Arc<dyn ProvisioningBackend>,
    pub feed: Arc<ChangeFeed>,
    pub provisioner: Arc<ProvisioningOrchestrator>,
    pub deletion: DeletionOrchestrator,
    pub query: QueryService,
    pub page_limit: usize,
}

/// Wires the registry, backend and controller components.
pub fn build_state(cfg: &AppConfig) -> Arc<AppState> {
    let feed = ChangeFeed::new_shared();
    let registry: Arc<dyn TenantRegistry> = Arc::new(EventedRegistry::new(
        InMemoryRegistry::new(),
        feed.clone(),
    ));
    let backend: Arc<dyn ProvisioningBackend> = if cfg.provisioning.auto_complete {
        SimulatedBackend::auto_completing()
    } else {
        SimulatedBackend::new_shared()
    };

    let mut template = StackTemplate::new(&cfg.provisioning.template_ref);
    if let Some(role) = &cfg.provisioning.execution_role {
        template = template.with_execution_role(role);
    }

    Arc::new(AppState {
        provisioner: Arc::new(ProvisioningOrchestrator::new(
            registry.clone(),
            backend.clone(),
            template,
        )),
        deletion: DeletionOrchestrator::new(registry.clone(), backend.clone()),
        query: QueryService::new(registry.clone(), backend.clone()),
        registry,
        backend,
        feed,
        page_limit: cfg.server.page_limit,
    })
}

/// Spawns the change feed consumer and status reconciler loops.
pub fn spawn_workers(state: &Arc<AppState>) {
    tokio::spawn(
        ChangeFeedConsumer::new(state.provisioner.clone()).run(state.feed.subscribe()),
    );
    tokio::spawn(StatusReconciler::new(state.registry.clone()).run(state.backend.subscribe()));
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route(
            "/tenants",
            get(routes::list_tenants).post(routes::register_tenant),
        )
        .route(
            "/tenants/{id}",
            get(routes::get_tenant).delete(routes::delete_tenant),
        )
        .route("/tenants/{id}/resources", get(routes::tenant_resources))
        .route("/tenants/{id}/retry", post(routes::retry_tenant))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct SilohubServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> SilohubServer {
        let state = build_state(&self.config);
        spawn_workers(&state);
        SilohubServer {
            addr: self.config.addr(),
            app: build_app(state),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SilohubServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
