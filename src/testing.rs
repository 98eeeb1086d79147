//! Fixture library shared by the handler tests.
//!
//! Library 1 (personal):
//! - 100 Physics > 101 Quantum > 102 Deep; 200 Reading
//! - items 10 (two attachments), 11, 12 and loose attachment 13 in 100;
//!   14 in 200; 42 outside any collection
//!
//! Library 2 (group): 300 Shared with item 30. Library 3 (feed): 400.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use crate::handler::AppState;
use crate::host::{Host, MemoryLibrary, Snapshot, Uploads};
use crate::model::{Collection, Item, Library, LibraryType};

fn library(id: i64, library_type: LibraryType, name: &str) -> Library {
    Library {
        id,
        library_type,
        name: name.to_string(),
    }
}

fn collection(id: i64, name: &str, parent_id: Option<i64>, library_id: i64) -> Collection {
    Collection {
        id,
        name: name.to_string(),
        parent_id,
        library_id,
    }
}

fn item(
    id: i64,
    key: &str,
    library_id: i64,
    item_type: &str,
    parent_item_id: Option<i64>,
    collections: &[i64],
    fields: &[(&str, &str)],
) -> Item {
    Item {
        id,
        key: key.to_string(),
        library_id,
        item_type: item_type.to_string(),
        date_added: "2024-01-02 10:00:00".to_string(),
        date_modified: "2024-01-03 11:00:00".to_string(),
        parent_item_id,
        collections: collections.to_vec(),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn fixture_snapshot() -> Snapshot {
    Snapshot {
        libraries: vec![
            library(1, LibraryType::User, "My Library"),
            library(2, LibraryType::Group, "Lab"),
            library(3, LibraryType::Feed, "arXiv feed"),
        ],
        collections: vec![
            collection(100, "Physics", None, 1),
            collection(101, "Quantum", Some(100), 1),
            collection(200, "Reading", None, 1),
            collection(102, "Deep", Some(101), 1),
            collection(300, "Shared", None, 2),
            collection(400, "Feed items", None, 3),
        ],
        items: vec![
            item(
                10,
                "QCOMP001",
                1,
                "journalArticle",
                None,
                &[100],
                &[("title", "Quantum Computing"), ("DOI", "10.1000/qc")],
            ),
            item(
                11,
                "OPTICS01",
                1,
                "book",
                None,
                &[100],
                &[("title", "Quantum Optics")],
            ),
            item(
                12,
                "CLASSIC1",
                1,
                "book",
                None,
                &[100],
                &[("title", "Classical Mechanics"), ("DOI", "")],
            ),
            item(
                13,
                "LOOSE001",
                1,
                "attachment",
                None,
                &[100],
                &[("title", "Loose Scan"), ("attachmentPath", "/scans/loose.png")],
            ),
            item(
                14,
                "READ0001",
                1,
                "book",
                None,
                &[200],
                &[("title", "Reading List")],
            ),
            item(
                20,
                "ATTPDF01",
                1,
                "attachment",
                Some(10),
                &[],
                &[
                    ("title", "Full Text PDF"),
                    ("attachmentPath", "storage:qc.pdf"),
                    ("path", "/old/qc.pdf"),
                    ("attachmentContentType", "application/pdf"),
                ],
            ),
            item(
                21,
                "ATTPNG01",
                1,
                "attachment",
                Some(10),
                &[],
                &[
                    ("title", "Scan"),
                    ("path", "/scans/qc.png"),
                    ("mimeType", "image/png"),
                ],
            ),
            item(
                42,
                "TARGET42",
                1,
                "report",
                None,
                &[],
                &[("title", "Upload Target")],
            ),
            item(
                30,
                "GRAVITY1",
                2,
                "journalArticle",
                None,
                &[300],
                &[("title", "Quantum Gravity")],
            ),
        ],
    }
}

pub fn fixture_library() -> MemoryLibrary {
    MemoryLibrary::new(fixture_snapshot())
}

pub fn fixture_host() -> Host {
    Host::from_backend(Arc::new(fixture_library()))
}

pub fn fixture_state(dir: &Path) -> AppState {
    fixture_state_with(dir, 1024 * 1024)
}

pub fn fixture_state_with(dir: &Path, max_upload_bytes: u64) -> AppState {
    AppState::new(
        fixture_host(),
        Uploads::new(dir.join("uploads"), max_upload_bytes),
    )
}

/// Sends one request and decodes the JSON body, `Null` when there is none.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
