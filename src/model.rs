use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

pub type LibraryId = i64;
pub type CollectionId = i64;
pub type ItemId = i64;

pub const ATTACHMENT_ITEM_TYPE: &str = "attachment";

/// Candidate field names for an attachment's file path, most specific first.
pub const ATTACHMENT_PATH_FIELDS: &[&str] = &["attachmentPath", "path"];

/// Candidate field names for an attachment's content type, most specific first.
pub const ATTACHMENT_CONTENT_TYPE_FIELDS: &[&str] = &["attachmentContentType", "mimeType"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    User,
    Group,
    Feed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    #[serde(rename = "libraryID")]
    pub id: LibraryId,
    pub library_type: LibraryType,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<CollectionId>,
    #[serde(rename = "libraryID")]
    pub library_id: LibraryId,
}

/// A library record as the host stores it. Named fields (`title`, `DOI`,
/// `attachmentPath`, ...) are flattened into the serialized object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "libraryID")]
    pub library_id: LibraryId,
    pub item_type: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub date_modified: String,
    #[serde(rename = "parentItemID", default)]
    pub parent_item_id: Option<ItemId>,
    #[serde(default)]
    pub collections: Vec<CollectionId>,
    #[serde(flatten, deserialize_with = "scalar_fields")]
    pub fields: BTreeMap<String, String>,
}

/// Keeps string, number and boolean fields as text. Structured values such
/// as `creators` or `tags` are dropped.
fn scalar_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(s) => Some((name, s)),
            serde_json::Value::Number(n) => Some((name, n.to_string())),
            serde_json::Value::Bool(b) => Some((name, b.to_string())),
            _ => None,
        })
        .collect())
}

impl Item {
    pub fn is_attachment(&self) -> bool {
        self.item_type == ATTACHMENT_ITEM_TYPE
    }

    /// Value of a named field; empty when the field is unset.
    pub fn get_field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    /// First non-empty value among `candidates`, tried in order.
    pub fn resolve_field(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .map(|name| self.get_field(name))
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionView {
    pub id: CollectionId,
    pub name: String,
    #[serde(rename = "parentID")]
    pub parent_id: Option<CollectionId>,
    #[serde(rename = "libraryID")]
    pub library_id: LibraryId,
    #[serde(rename = "childCollections")]
    pub child_collections: Vec<CollectionView>,
}

impl CollectionView {
    pub fn leaf(collection: Collection) -> Self {
        Self {
            id: collection.id,
            name: collection.name,
            parent_id: collection.parent_id,
            library_id: collection.library_id,
            child_collections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentView {
    pub id: ItemId,
    pub path: Option<String>,
    #[serde(rename = "attachmentType")]
    pub attachment_type: Option<String>,
}

impl From<&Item> for AttachmentView {
    fn from(attachment: &Item) -> Self {
        Self {
            id: attachment.id,
            path: attachment
                .resolve_field(ATTACHMENT_PATH_FIELDS)
                .map(str::to_string),
            attachment_type: attachment
                .resolve_field(ATTACHMENT_CONTENT_TYPE_FIELDS)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub item_type: String,
    pub date_added: String,
    pub date_modified: String,
    pub doi: Option<String>,
    pub attachments: Vec<AttachmentView>,
}

impl ItemSummary {
    pub fn new(item: &Item, attachments: &[Item]) -> Self {
        Self {
            id: item.id,
            title: item.get_field("title").to_string(),
            item_type: item.item_type.clone(),
            date_added: item.date_added.clone(),
            date_modified: item.date_modified.clone(),
            doi: item.resolve_field(&["DOI"]).map(str::to_string),
            attachments: attachments.iter().map(AttachmentView::from).collect(),
        }
    }
}

fn default_operator() -> String {
    "contains".to_string()
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCondition {
    pub condition: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl SearchCondition {
    pub fn new(condition: &str, operator: &str, value: impl Into<String>) -> Self {
        Self {
            condition: condition.to_string(),
            operator: operator.to_string(),
            value: value.into(),
            required: true,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Flag(b) => b.to_string(),
    })
}

/// A conjunctive set of conditions scoped to one library.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub library_id: LibraryId,
    pub conditions: Vec<SearchCondition>,
}

impl SearchQuery {
    pub fn new(library_id: LibraryId) -> Self {
        Self {
            library_id,
            conditions: Vec::new(),
        }
    }

    pub fn add_condition(&mut self, condition: SearchCondition) -> &mut Self {
        self.conditions.push(condition);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    LinkedFile,
}

/// A file already on disk to be linked under a parent item.
#[derive(Debug, Clone)]
pub struct LinkedFile {
    pub parent_item_id: ItemId,
    pub path: String,
    pub filename: String,
    pub content_type: String,
    pub charset: Option<String>,
    pub link_mode: LinkMode,
}
