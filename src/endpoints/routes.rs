use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, StatusCode},
    middleware,
    response::Response,
    routing::{MethodRouter, on},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    EndpointDescriptor, enforce_contract, list_collections, list_items, search, upload_file,
};
use crate::api::error_response;
use crate::handler::AppState;

pub const PREFIX: &str = "/zotserver";

pub struct Route {
    pub endpoint: EndpointDescriptor,
    pub handler: MethodRouter<AppState>,
}

impl Route {
    fn new(endpoint: EndpointDescriptor, handler: MethodRouter<AppState>) -> Self {
        Self { endpoint, handler }
    }
}

pub fn route_table() -> Vec<Route> {
    vec![
        Route::new(
            search::ENDPOINT,
            on(search::ENDPOINT.methods, search::init),
        ),
        Route::new(
            list_collections::ENDPOINT,
            on(list_collections::ENDPOINT.methods, list_collections::init),
        ),
        Route::new(
            list_items::ENDPOINT,
            on(list_items::ENDPOINT.methods, list_items::init),
        ),
        // The handler enforces its own cap while streaming the file part.
        Route::new(
            upload_file::ENDPOINT,
            on(upload_file::ENDPOINT.methods, upload_file::init).layer(DefaultBodyLimit::disable()),
        ),
    ]
}

async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "Endpoint does not support method",
    )
}

pub fn routes() -> Router<AppState> {
    let table = route_table();
    let paths: Vec<String> = table
        .iter()
        .map(|r| format!("{}{}", PREFIX, r.endpoint.path))
        .collect();

    let router = table.into_iter().fold(Router::new(), |router, route| {
        let contract = middleware::from_fn_with_state(route.endpoint, enforce_contract);
        let handler = route.handler.fallback(method_not_allowed).layer(contract);
        router.route(route.endpoint.path, handler)
    });

    tracing::info!(endpoints = ?paths, "endpoints registered");
    router
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .nest(PREFIX, routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
