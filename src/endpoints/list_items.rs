use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    routing::MethodFilter,
};
use serde::Deserialize;

use super::EndpointDescriptor;
use crate::api::JSON_CONTENT_TYPE;
use crate::error::{HandlerError, HostError};
use crate::handler::AppState;
use crate::host::Host;
use crate::model::{CollectionId, ItemSummary, SearchCondition, SearchQuery};

pub const ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    path: "/listItems",
    methods: MethodFilter::GET,
    data_types: &[JSON_CONTENT_TYPE],
    permit_bookmarklet: false,
};

#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    #[serde(rename = "collectionID")]
    pub collection_id: Option<String>,
    #[serde(rename = "withAttachments")]
    pub with_attachments: Option<String>,
}

/// The `withAttachments` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentFilter {
    Any,
    WithAttachments,
    WithoutAttachments,
    /// Unrecognised value; admits nothing.
    Unmatched,
}

impl AttachmentFilter {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None => AttachmentFilter::Any,
            Some("1") => AttachmentFilter::WithAttachments,
            Some("0") => AttachmentFilter::WithoutAttachments,
            Some(_) => AttachmentFilter::Unmatched,
        }
    }

    pub fn admits(self, has_attachments: bool) -> bool {
        match self {
            AttachmentFilter::Any => true,
            AttachmentFilter::WithAttachments => has_attachments,
            AttachmentFilter::WithoutAttachments => !has_attachments,
            AttachmentFilter::Unmatched => false,
        }
    }
}

pub async fn init(
    State(state): State<AppState>,
    query: Result<Query<ListItemsParams>, QueryRejection>,
) -> Result<Json<Vec<ItemSummary>>, HandlerError> {
    let Query(params) = query.map_err(|e| HandlerError::validation(e.body_text()))?;
    let raw_id = params
        .collection_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HandlerError::validation("collectionID is required"))?;
    let collection_id: CollectionId = raw_id
        .parse()
        .map_err(|_| HandlerError::validation("collectionID must be a number"))?;
    let filter = AttachmentFilter::from_param(params.with_attachments.as_deref());

    let items = items_in_collection(&state.host, collection_id, filter).await?;
    tracing::info!(collection_id, ?filter, count = items.len(), "listed items");
    Ok(Json(items))
}

/// Non-attachment items of a collection that pass `filter`, in search order.
pub async fn items_in_collection(
    host: &Host,
    collection_id: CollectionId,
    filter: AttachmentFilter,
) -> Result<Vec<ItemSummary>, HostError> {
    let collection = host
        .collections
        .collection(collection_id)
        .await?
        .ok_or_else(|| HostError::collection_not_found(collection_id))?;

    let mut query = SearchQuery::new(collection.library_id);
    query.add_condition(SearchCondition::new(
        "collectionID",
        "is",
        collection_id.to_string(),
    ));

    let item_ids = host.search.search(&query).await?;
    let items = host.items.items(&item_ids).await?;

    let mut summaries = Vec::new();
    for item in items.iter().filter(|item| !item.is_attachment()) {
        let attachment_ids = host.items.attachment_ids(item.id).await?;
        let attachments = host.items.items(&attachment_ids).await?;

        if filter.admits(!attachments.is_empty()) {
            summaries.push(ItemSummary::new(item, &attachments));
        }
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;

    use super::*;
    use crate::endpoints::app;
    use crate::testing::{fixture_host, fixture_state, send};

    async fn ids(filter: AttachmentFilter) -> Vec<i64> {
        items_in_collection(&fixture_host(), 100, filter)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect()
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(AttachmentFilter::from_param(None), AttachmentFilter::Any);
        assert_eq!(
            AttachmentFilter::from_param(Some("1")),
            AttachmentFilter::WithAttachments
        );
        assert_eq!(
            AttachmentFilter::from_param(Some("0")),
            AttachmentFilter::WithoutAttachments
        );
        assert!(!AttachmentFilter::from_param(Some("yes")).admits(true));
        assert!(!AttachmentFilter::from_param(Some("yes")).admits(false));
    }

    #[tokio::test]
    async fn attachments_are_never_listed_as_items() {
        assert_eq!(ids(AttachmentFilter::Any).await, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn unset_filter_is_union_of_partitions() {
        let all = ids(AttachmentFilter::Any).await;
        let with = ids(AttachmentFilter::WithAttachments).await;
        let without = ids(AttachmentFilter::WithoutAttachments).await;
        assert_eq!(with, vec![10]);
        assert_eq!(without, vec![11, 12]);

        let with_set: HashSet<_> = with.iter().collect();
        let without_set: HashSet<_> = without.iter().collect();
        assert!(with_set.is_disjoint(&without_set));
        let union: HashSet<_> = with_set.union(&without_set).copied().collect();
        let all_set: HashSet<_> = all.iter().collect();
        assert_eq!(union, all_set);
        assert_eq!(all.len(), with.len() + without.len());
    }

    #[tokio::test]
    async fn summary_resolves_attachment_fields() {
        let items = items_in_collection(&fixture_host(), 100, AttachmentFilter::WithAttachments)
            .await
            .unwrap();
        let json = serde_json::to_value(&items).unwrap();
        assert_eq!(
            json,
            json!([{
                "id": 10,
                "title": "Quantum Computing",
                "itemType": "journalArticle",
                "dateAdded": "2024-01-02 10:00:00",
                "dateModified": "2024-01-03 11:00:00",
                "doi": "10.1000/qc",
                "attachments": [
                    {"id": 20, "path": "storage:qc.pdf", "attachmentType": "application/pdf"},
                    {"id": 21, "path": "/scans/qc.png", "attachmentType": "image/png"}
                ]
            }])
        );
    }

    #[tokio::test]
    async fn missing_collection_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::get("/zotserver/listItems")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(fixture_state(dir.path())), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "collectionID is required"}));
    }

    #[tokio::test]
    async fn non_numeric_collection_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::get("/zotserver/listItems?collectionID=abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(fixture_state(dir.path())), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "collectionID must be a number"}));
    }

    #[tokio::test]
    async fn repeated_query_parameters_are_json_bad_requests() {
        for query in [
            "collectionID=100&collectionID=200",
            "collectionID=100&withAttachments=1&withAttachments=0",
        ] {
            let dir = tempfile::tempdir().unwrap();
            let request = Request::get(format!("/zotserver/listItems?{query}"))
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(fixture_state(dir.path())), request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("duplicate field"));
        }
    }

    #[tokio::test]
    async fn unknown_collection_never_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::get("/zotserver/listItems?collectionID=9999")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(fixture_state(dir.path())), request).await;
        assert_ne!(status, StatusCode::OK);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Collection with ID 9999 not found"}));
    }

    #[tokio::test]
    async fn without_attachments_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::get("/zotserver/listItems?collectionID=100&withAttachments=0")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(fixture_state(dir.path())), request).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["Quantum Optics", "Classical Mechanics"]);
        assert_eq!(body[0]["doi"], serde_json::Value::Null);
        assert_eq!(body[0]["attachments"], json!([]));
    }
}
