use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Configuration;
use crate::provider::SearchProvider;
use crate::types::*;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Routes a host process uses to drive the provider over HTTP.
pub fn router(provider: Arc<SearchProvider>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/search", post(search_handler))
        .route("/subsearch", post(subsearch_handler))
        .route("/pending", get(pending_handler))
        .route("/metas", post(metas_handler))
        .route("/activate", post(activate_handler))
        .route("/filter", post(filter_handler))
        .route("/settings", get(get_settings).put(put_settings))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(provider)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn search_handler(
    State(provider): State<Arc<SearchProvider>>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let ids = provider.initial_search(request.terms.as_slice()).await;
    Json(search_response(ids))
}

fn search_response(ids: Option<Vec<String>>) -> SearchResponse {
    match ids {
        Some(ids) => SearchResponse {
            ids,
            superseded: false,
        },
        None => SearchResponse {
            ids: Vec::new(),
            superseded: true,
        },
    }
}

async fn subsearch_handler(
    State(provider): State<Arc<SearchProvider>>,
    Json(request): Json<SubsearchRequest>,
) -> Json<SearchResponse> {
    let ids = provider
        .subsearch(&request.previous, request.terms.as_slice())
        .await;
    Json(search_response(ids))
}

async fn pending_handler(State(provider): State<Arc<SearchProvider>>) -> Json<PendingResponse> {
    Json(PendingResponse {
        ids: provider.pending_ids(),
    })
}

async fn metas_handler(
    State(provider): State<Arc<SearchProvider>>,
    Json(request): Json<MetasRequest>,
) -> Json<MetasResponse> {
    let metas = provider.get_result_metas(&request.ids).await;
    Json(MetasResponse { metas })
}

async fn activate_handler(
    State(provider): State<Arc<SearchProvider>>,
    Json(request): Json<ActivateRequest>,
) -> Result<StatusCode, ApiError> {
    match provider.activate(&request.id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No result with id {}", request.id),
            }),
        )),
        Err(e) => {
            error!("Activate error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

async fn filter_handler(
    State(provider): State<Arc<SearchProvider>>,
    Json(request): Json<FilterRequest>,
) -> Json<FilterResponse> {
    Json(FilterResponse {
        ids: provider.filter_results(&request.ids, request.max),
    })
}

async fn get_settings(State(provider): State<Arc<SearchProvider>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        configuration: provider.settings().snapshot(),
    })
}

async fn put_settings(
    State(provider): State<Arc<SearchProvider>>,
    Json(configuration): Json<Configuration>,
) -> Json<SettingsResponse> {
    info!("Settings update over HTTP");
    provider.settings().update(configuration);
    Json(SettingsResponse { configuration })
}
