use axum::{Json, body::Bytes, extract::State, routing::MethodFilter};

use super::EndpointDescriptor;
use crate::api::JSON_CONTENT_TYPE;
use crate::error::HandlerError;
use crate::handler::AppState;
use crate::host::{Host, HostResult};
use crate::model::{Item, SearchCondition, SearchQuery};

pub const ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    path: "/search",
    methods: MethodFilter::POST,
    data_types: &[JSON_CONTENT_TYPE],
    permit_bookmarklet: false,
};

pub async fn init(State(state): State<AppState>, body: Bytes) -> Result<Json<Vec<Item>>, HandlerError> {
    let conditions: Vec<SearchCondition> = serde_json::from_slice(&body)
        .map_err(|e| HandlerError::validation(format!("invalid search conditions: {e}")))?;

    let count = conditions.len();
    let items = run_search(&state.host, conditions).await?;
    tracing::info!(conditions = count, matched = items.len(), "search completed");
    Ok(Json(items))
}

/// Runs all conditions as one query over the personal library. An empty
/// list is passed through unchanged.
pub async fn run_search(host: &Host, conditions: Vec<SearchCondition>) -> HostResult<Vec<Item>> {
    let mut query = SearchQuery::new(host.collections.user_library_id().await?);
    for condition in conditions {
        query.add_condition(condition);
    }

    let item_ids = host.search.search(&query).await?;
    host.items.items(&item_ids).await
}
