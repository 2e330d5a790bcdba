//! Editor image uploads.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::upload::{UploadLimits, UploadedFile};
use crate::AppState;

/// Multipart field carrying the file.
pub const UPLOAD_FIELD: &str = "upload_file";

/// Storage namespace for images attached to topics.
const TOPIC_NAMESPACE: &str = "topics";

/// Response shape the editor expects.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadResult {
    pub success: bool,
    pub msg: String,
    pub file_path: String,
}

impl UploadResult {
    fn failed() -> Self {
        Self {
            success: false,
            msg: "上传失败!".to_string(),
            file_path: String::new(),
        }
    }
}

/// POST /upload_image - Store an image for the topic editor.
///
/// Never fails at the HTTP level: every problem is reported as `success: false`.
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<UploadResult> {
    let mut data = UploadResult::failed();

    let file = match multipart {
        Ok(mut multipart) => read_upload_file(&mut multipart).await,
        Err(rejection) => {
            tracing::debug!("Upload without multipart body: {}", rejection);
            None
        }
    };
    let Some(file) = file else {
        return Json(data);
    };

    let limits = UploadLimits {
        max_kb: state.config.upload_max_kb,
        max_width: state.config.upload_max_width,
    };

    match state
        .uploader
        .save(file, TOPIC_NAMESPACE, user.id, limits)
        .await
    {
        Ok(Some(stored)) => {
            data.file_path = stored.path;
            data.msg = "上传成功!".to_string();
            data.success = true;
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to store upload for user {}: {}", user.id, e),
    }

    Json(data)
}

async fn read_upload_file(multipart: &mut Multipart) -> Option<UploadedFile> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Malformed multipart upload: {}", e);
                return None;
            }
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read upload body: {}", e);
                return None;
            }
        };

        if bytes.is_empty() {
            return None;
        }

        return Some(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
}
