use axum::{Json, extract::State, routing::MethodFilter};
use futures_util::future::BoxFuture;

use super::EndpointDescriptor;
use crate::api::JSON_CONTENT_TYPE;
use crate::error::HandlerError;
use crate::handler::AppState;
use crate::host::{CollectionStore, Host, HostResult};
use crate::model::{Collection, CollectionView, LibraryType};

pub const ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    path: "/listCollections",
    methods: MethodFilter::GET,
    data_types: &[JSON_CONTENT_TYPE],
    permit_bookmarklet: false,
};

pub async fn init(State(state): State<AppState>) -> Result<Json<Vec<CollectionView>>, HandlerError> {
    let collections = all_collections(&state.host).await?;
    tracing::info!(top_level = collections.len(), "listed collections");
    Ok(Json(collections))
}

/// Collection trees of the personal library followed by every group library.
pub async fn all_collections(host: &Host) -> HostResult<Vec<CollectionView>> {
    let store = host.collections.as_ref();
    let user_library_id = store.user_library_id().await?;
    let group_library_ids = store
        .libraries()
        .await?
        .into_iter()
        .filter(|lib| lib.library_type == LibraryType::Group)
        .map(|lib| lib.id);

    let mut collections = Vec::new();
    for library_id in std::iter::once(user_library_id).chain(group_library_ids) {
        for collection in store.top_level_collections(library_id).await? {
            collections.push(collection_tree(store, collection).await?);
        }
    }

    Ok(collections)
}

// Depth follows the host's tree; a cycle there would not terminate.
fn collection_tree<'a>(
    store: &'a dyn CollectionStore,
    collection: Collection,
) -> BoxFuture<'a, HostResult<CollectionView>> {
    Box::pin(async move {
        let children = store.child_collections(collection.id).await?;
        let mut view = CollectionView::leaf(collection);
        for child in children {
            view.child_collections.push(collection_tree(store, child).await?);
        }
        Ok(view)
    })
}
