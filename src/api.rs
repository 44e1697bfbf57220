use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::StreamExt;
use tokio::net::ToSocketAddrs;

use crate::broadcast::Hub;
use crate::container::{self, ContainerID};
use crate::runtime::{self, Runtime};

mod models;

pub use models::ContainerProperties;

#[derive(Debug, serde::Deserialize)]
pub struct SubscribeParams {
    #[serde(rename = "containerId")]
    pub container_id: Option<String>,
}

struct AppState<R> {
    runtime: Arc<R>,
    hub: Hub,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            hub: self.hub.clone(),
        }
    }
}

fn cors_headers() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        cors_headers(),
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

/// Streams the derived metrics of one container as server-sent events.
async fn subscribe<R: Runtime>(
    State(state): State<AppState<R>>,
    params: Result<Query<SubscribeParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let container_id = match ContainerID::new(params.container_id.unwrap_or_default()) {
        Ok(container_id) => container_id,
        Err(container::Error::EmptyContainerID) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "containerId query parameter is required",
            );
        }
    };

    match state.hub.subscribe(&*state.runtime, container_id.clone()).await {
        Ok(stream) => {
            let events = stream.map(|metric| Event::default().json_data(metric));
            (cors_headers(), Sse::new(events)).into_response()
        }
        Err(err) => {
            log::error!(
                "Failed to open stats stream for container `{}`: {}",
                container_id,
                err
            );
            let status = match &err {
                runtime::Error::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                    StatusCode::NOT_FOUND
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            error_response(status, err)
        }
    }
}

async fn list_containers<R: Runtime>(State(state): State<AppState<R>>) -> Response {
    match state.runtime.list_containers().await {
        Ok(containers) => {
            let containers: Vec<ContainerProperties> =
                containers.into_iter().map(ContainerProperties::from).collect();
            (StatusCode::OK, Json(containers)).into_response()
        }
        Err(err) => {
            log::error!("Failed to list containers: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

async fn daemon_info<R: Runtime>(State(state): State<AppState<R>>) -> Response {
    match state.runtime.info().await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(err) => {
            log::error!("Failed to query daemon info: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

async fn health<R: Runtime>(State(state): State<AppState<R>>) -> Response {
    let body = serde_json::json!({
        "status": "ok",
        "subscribers": state.hub.subscribers().len(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new<R: Runtime>(runtime: Arc<R>, hub: Hub) -> Self {
        let router = axum::Router::new()
            .route("/sse", get(subscribe::<R>))
            .route("/containers", get(list_containers::<R>))
            .route("/info", get(daemon_info::<R>))
            .route("/healthz", get(health::<R>))
            .with_state(AppState { runtime, hub });
        Self { router }
    }

    pub fn into_router(self) -> axum::Router {
        self.router
    }

    /// Serves the API until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener fails.
    pub async fn listen(
        self,
        addr: impl ToSocketAddrs,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
