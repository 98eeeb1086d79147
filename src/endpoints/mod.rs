//! Library Endpoints
//!
//! Four handlers mounted under `/zotserver` that let trusted local tools read
//! and extend the reference library:
//!
//! - `POST /search` - structured search over the personal library
//! - `GET /listCollections` - collection trees of every library
//! - `GET /listItems` - items of one collection with their attachments
//! - `POST /uploadFile` - store a file and attach it to an item
//!
//! Each handler module exports an [`EndpointDescriptor`] alongside its `init`
//! handler. The registrar in `routes.rs` builds the route table from these
//! once at startup and wraps every route in [`enforce_contract`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use zotserver::endpoints;
//!
//! let app = endpoints::app(app_state);
//! axum::serve(listener, app).await?;
//! ```

mod list_collections;
mod list_items;
mod routes;
mod search;
mod upload_file;

pub use list_collections::all_collections;
pub use list_items::{AttachmentFilter, items_in_collection};
pub use routes::{PREFIX, Route, app, route_table, routes};
pub use search::run_search;
pub use upload_file::GENERIC_CONTENT_TYPE;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
    routing::MethodFilter,
};

use crate::api::{bad_request, forbidden, media_type};

/// Origin the reference manager's browser bookmarklet sends requests from.
pub const BOOKMARKLET_ORIGIN: &str = "https://www.zotero.org";

/// What an endpoint accepts.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    pub path: &'static str,
    pub methods: MethodFilter,
    pub data_types: &'static [&'static str],
    pub permit_bookmarklet: bool,
}

impl EndpointDescriptor {
    pub fn supports_data_type(&self, content_type: &str) -> bool {
        let media = media_type(content_type);
        self.data_types.iter().any(|t| *t == media)
    }
}

fn is_bookmarklet(headers: &HeaderMap) -> bool {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|origin| origin.eq_ignore_ascii_case(BOOKMARKLET_ORIGIN))
}

/// Rejects bookmarklet callers on trusted-only endpoints and POST bodies whose
/// declared content type the endpoint does not support. A missing
/// `Content-Type` is left for the handler to judge.
pub async fn enforce_contract(
    State(endpoint): State<EndpointDescriptor>,
    request: Request,
    next: Next,
) -> Response {
    if !endpoint.permit_bookmarklet && is_bookmarklet(request.headers()) {
        tracing::warn!(path = endpoint.path, "rejected bookmarklet request");
        return forbidden("Endpoint does not permit bookmarklet requests");
    }

    if request.method() == Method::POST {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if let Some(ct) = content_type {
            if !endpoint.supports_data_type(ct) {
                tracing::info!(path = endpoint.path, content_type = ct, "unsupported content type");
                return bad_request("Endpoint does not support content-type");
            }
        }
    }

    next.run(request).await
}
