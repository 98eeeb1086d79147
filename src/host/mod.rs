//! Host capability interface
//!
//! The endpoints never touch library storage directly. Everything they need
//! from the reference manager goes through four traits:
//!
//! - [`CollectionStore`] - libraries and the collection tree
//! - [`ItemStore`] - item lookup and attachment enumeration
//! - [`SearchExecutor`] - runs a [`SearchQuery`] and yields item IDs
//! - [`AttachmentWriter`] - links a stored file under a parent item
//!
//! [`Host`] bundles one implementation of each so it can be cloned into the
//! router state. [`MemoryLibrary`] implements all four and backs both the
//! standalone binary and the handler tests.

mod files;
mod memory;

pub use files::{StagedUpload, Uploads};
pub use memory::{MemoryLibrary, Snapshot};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HostError;
use crate::model::{
    Collection, CollectionId, Item, ItemId, Library, LibraryId, LinkedFile, SearchQuery,
};

pub type HostResult<T> = Result<T, HostError>;

#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn user_library_id(&self) -> HostResult<LibraryId>;

    async fn libraries(&self) -> HostResult<Vec<Library>>;

    /// Collections of `library_id` that have no parent.
    async fn top_level_collections(&self, library_id: LibraryId) -> HostResult<Vec<Collection>>;

    async fn child_collections(&self, collection_id: CollectionId) -> HostResult<Vec<Collection>>;

    async fn collection(&self, id: CollectionId) -> HostResult<Option<Collection>>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn item(&self, id: ItemId) -> HostResult<Option<Item>>;

    /// Materializes `ids` in order, skipping IDs the host does not know.
    async fn items(&self, ids: &[ItemId]) -> HostResult<Vec<Item>>;

    async fn attachment_ids(&self, item_id: ItemId) -> HostResult<Vec<ItemId>>;
}

#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> HostResult<Vec<ItemId>>;
}

#[async_trait]
pub trait AttachmentWriter: Send + Sync {
    /// Creates and saves a linked-file attachment, returning the new item.
    async fn link_file(&self, file: LinkedFile) -> HostResult<Item>;
}

#[derive(Clone)]
pub struct Host {
    pub collections: Arc<dyn CollectionStore>,
    pub items: Arc<dyn ItemStore>,
    pub search: Arc<dyn SearchExecutor>,
    pub attachments: Arc<dyn AttachmentWriter>,
}

impl Host {
    /// Uses a single backend for every capability.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CollectionStore + ItemStore + SearchExecutor + AttachmentWriter + 'static,
    {
        Self {
            collections: backend.clone(),
            items: backend.clone(),
            search: backend.clone(),
            attachments: backend,
        }
    }
}
