use std::path::Path;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::header,
    routing::MethodFilter,
};

use super::EndpointDescriptor;
use crate::api::{JSON_CONTENT_TYPE, MULTIPART_CONTENT_TYPE, media_type};
use crate::error::{HandlerError, HostError};
use crate::handler::AppState;
use crate::host::{Host, StagedUpload, Uploads};
use crate::model::{Item, ItemId, LinkMode, LinkedFile};

pub const ENDPOINT: EndpointDescriptor = EndpointDescriptor {
    path: "/uploadFile",
    methods: MethodFilter::POST,
    data_types: &[JSON_CONTENT_TYPE, MULTIPART_CONTENT_TYPE],
    permit_bookmarklet: false,
};

/// Content type recorded on every uploaded attachment.
pub const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Default)]
struct UploadForm {
    item_id: Option<String>,
    file: Option<StagedUpload>,
    declared_type: Option<String>,
}

impl UploadForm {
    async fn discard(self) {
        if let Some(file) = self.file {
            file.discard().await;
        }
    }
}

fn multipart_error(e: MultipartError) -> HandlerError {
    HandlerError::validation(e.body_text())
}

pub async fn init(State(state): State<AppState>, request: Request) -> Result<Json<Item>, HandlerError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| media_type(v) == MULTIPART_CONTENT_TYPE);
    if !is_multipart {
        return Err(HandlerError::validation(
            "Content-Type header is missing or invalid",
        ));
    }

    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|e| HandlerError::validation(e.body_text()))?;

    let mut form = UploadForm::default();
    if let Err(e) = read_form(&state.uploads, &mut multipart, &mut form).await {
        form.discard().await;
        return Err(e);
    }

    let item_id = form.item_id.take().filter(|id| !id.is_empty());
    let (raw_id, staged) = match (item_id, form.file.take()) {
        (Some(id), Some(file)) => (id, file),
        (_, file) => {
            if let Some(file) = file {
                file.discard().await;
            }
            return Err(HandlerError::validation("itemID and file are required"));
        }
    };

    let item_id: ItemId = match raw_id.trim().parse() {
        Ok(id) => id,
        Err(_) => {
            staged.discard().await;
            return Err(HandlerError::validation("itemID must be a number"));
        }
    };

    let size = staged.written();
    let path = staged.finish().await?;
    tracing::info!(item_id, size, path = %path.display(), "stored uploaded file");
    tracing::debug!(
        declared = ?form.declared_type,
        stored = GENERIC_CONTENT_TYPE,
        "declared content type not carried to attachment"
    );

    let parent = attach_file(&state.host, item_id, &path).await?;
    Ok(Json(parent))
}

/// Streams the multipart body, writing the `file` part to disk chunk by chunk.
async fn read_form(
    uploads: &Uploads,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), HandlerError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                // A part without a filename is a plain form value, not a file.
                let Some(original) = field.file_name().map(str::to_string) else {
                    continue;
                };
                if form.file.is_some() {
                    tracing::warn!("ignoring additional file part");
                    continue;
                }
                form.declared_type = field.content_type().map(str::to_string);

                let staged = form.file.insert(uploads.stage(&original).await?);
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    staged.write_chunk(&chunk).await?;
                }
            }
            Some("itemID") => {
                let value = field.text().await.map_err(multipart_error)?;
                form.item_id = Some(value.replace('"', ""));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Links the stored file under `item_id` and returns the parent item.
/// The file stays on disk if this fails.
pub async fn attach_file(host: &Host, item_id: ItemId, path: &Path) -> Result<Item, HandlerError> {
    let parent = host
        .items
        .item(item_id)
        .await?
        .ok_or_else(|| HostError::item_not_found(item_id))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let attachment = host
        .attachments
        .link_file(LinkedFile {
            parent_item_id: item_id,
            path: path.display().to_string(),
            filename,
            content_type: GENERIC_CONTENT_TYPE.to_string(),
            charset: None,
            link_mode: LinkMode::LinkedFile,
        })
        .await?;

    tracing::info!(item_id, attachment_id = attachment.id, "attached uploaded file");
    Ok(parent)
}
