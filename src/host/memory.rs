use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{AttachmentWriter, CollectionStore, HostResult, ItemStore, SearchExecutor};
use crate::error::HostError;
use crate::model::{
    ATTACHMENT_ITEM_TYPE, Collection, CollectionId, Item, ItemId, Library, LibraryId,
    LibraryType, LinkMode, LinkedFile, SearchCondition, SearchQuery,
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Exported library state, as read from a JSON snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Snapshot {
    /// A personal library with ID 1 and nothing in it.
    pub fn empty() -> Self {
        Self {
            libraries: vec![Library {
                id: 1,
                library_type: LibraryType::User,
                name: "My Library".to_string(),
            }],
            ..Default::default()
        }
    }
}

/// In-process host backend. Enumeration order is snapshot order.
pub struct MemoryLibrary {
    state: RwLock<Snapshot>,
}

impl MemoryLibrary {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read library snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse library snapshot {}", path.display()))?;
        tracing::info!(
            libraries = snapshot.libraries.len(),
            collections = snapshot.collections.len(),
            items = snapshot.items.len(),
            "loaded library snapshot"
        );
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl CollectionStore for MemoryLibrary {
    async fn user_library_id(&self) -> HostResult<LibraryId> {
        let state = self.state.read().await;
        state
            .libraries
            .iter()
            .find(|lib| lib.library_type == LibraryType::User)
            .map(|lib| lib.id)
            .ok_or_else(|| HostError::Backend("no personal library".to_string()))
    }

    async fn libraries(&self) -> HostResult<Vec<Library>> {
        Ok(self.state.read().await.libraries.clone())
    }

    async fn top_level_collections(&self, library_id: LibraryId) -> HostResult<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .iter()
            .filter(|c| c.library_id == library_id && c.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn child_collections(&self, collection_id: CollectionId) -> HostResult<Vec<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .iter()
            .filter(|c| c.parent_id == Some(collection_id))
            .cloned()
            .collect())
    }

    async fn collection(&self, id: CollectionId) -> HostResult<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state.collections.iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl ItemStore for MemoryLibrary {
    async fn item(&self, id: ItemId) -> HostResult<Option<Item>> {
        let state = self.state.read().await;
        Ok(state.items.iter().find(|i| i.id == id).cloned())
    }

    async fn items(&self, ids: &[ItemId]) -> HostResult<Vec<Item>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.items.iter().find(|i| i.id == *id).cloned())
            .collect())
    }

    async fn attachment_ids(&self, item_id: ItemId) -> HostResult<Vec<ItemId>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|i| i.is_attachment() && i.parent_item_id == Some(item_id))
            .map(|i| i.id)
            .collect())
    }
}

#[async_trait]
impl SearchExecutor for MemoryLibrary {
    async fn search(&self, query: &SearchQuery) -> HostResult<Vec<ItemId>> {
        let state = self.state.read().await;
        let (required, optional): (Vec<_>, Vec<_>) =
            query.conditions.iter().partition(|c| c.required);

        let mut ids = Vec::new();
        for item in state.items.iter().filter(|i| i.library_id == query.library_id) {
            let mut admitted = true;
            for condition in &required {
                if !matches(item, condition)? {
                    admitted = false;
                    break;
                }
            }
            if admitted && !optional.is_empty() {
                let mut any = false;
                for condition in &optional {
                    if matches(item, condition)? {
                        any = true;
                        break;
                    }
                }
                admitted = any;
            }
            if admitted {
                ids.push(item.id);
            }
        }

        tracing::debug!(
            library_id = query.library_id,
            conditions = query.conditions.len(),
            matched = ids.len(),
            "search executed"
        );
        Ok(ids)
    }
}

#[async_trait]
impl AttachmentWriter for MemoryLibrary {
    async fn link_file(&self, file: LinkedFile) -> HostResult<Item> {
        let mut state = self.state.write().await;
        let parent = state
            .items
            .iter()
            .find(|i| i.id == file.parent_item_id)
            .ok_or_else(|| HostError::item_not_found(file.parent_item_id))?;
        let library_id = parent.library_id;

        let id = state.items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        let now = chrono::Utc::now().format(DATE_FORMAT).to_string();
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("title".to_string(), file.filename.clone());
        fields.insert("attachmentFilename".to_string(), file.filename);
        fields.insert("attachmentPath".to_string(), file.path);
        fields.insert("attachmentContentType".to_string(), file.content_type);
        if let Some(charset) = file.charset {
            fields.insert("attachmentCharset".to_string(), charset);
        }
        fields.insert(
            "attachmentLinkMode".to_string(),
            match file.link_mode {
                LinkMode::LinkedFile => "linked_file".to_string(),
            },
        );

        let attachment = Item {
            id,
            key: format!("ATT{id:05}"),
            library_id,
            item_type: ATTACHMENT_ITEM_TYPE.to_string(),
            date_added: now.clone(),
            date_modified: now,
            parent_item_id: Some(file.parent_item_id),
            collections: Vec::new(),
            fields,
        };
        state.items.push(attachment.clone());
        Ok(attachment)
    }
}

fn field_value(item: &Item, field: &str) -> String {
    match field {
        "itemType" => item.item_type.clone(),
        "parentItemID" => item
            .parent_item_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        "key" => item.key.clone(),
        name => item.get_field(name).to_string(),
    }
}

fn matches(item: &Item, condition: &SearchCondition) -> HostResult<bool> {
    if condition.condition == "collectionID" {
        let member = condition
            .value
            .trim()
            .parse::<CollectionId>()
            .map(|id| item.collections.contains(&id))
            .unwrap_or(false);
        return match condition.operator.as_str() {
            "is" => Ok(member),
            "isNot" => Ok(!member),
            other => Err(HostError::UnsupportedOperator(other.to_string())),
        };
    }

    let actual = field_value(item, &condition.condition);
    let actual_lower = actual.to_lowercase();
    let expected_lower = condition.value.to_lowercase();
    match condition.operator.as_str() {
        "is" => Ok(actual == condition.value),
        "isNot" => Ok(actual != condition.value),
        "contains" => Ok(actual_lower.contains(&expected_lower)),
        "doesNotContain" => Ok(!actual_lower.contains(&expected_lower)),
        "beginsWith" => Ok(actual_lower.starts_with(&expected_lower)),
        other => Err(HostError::UnsupportedOperator(other.to_string())),
    }
}
