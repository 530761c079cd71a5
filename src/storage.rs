use google_cloud_storage::client::Client as GcsClient;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use uuid::Uuid;

use crate::error::ApiError;

pub const MAX_VIDEO_BYTES: usize = 500 * 1024 * 1024;

/// Blob-store wrapper for uploaded pen-camera footage. Stores objects under
/// `uploads/<animal_id>/` and hands back both the `gs://` path and a
/// retrievable URL.
pub struct VideoStore {
    client: GcsClient,
    bucket: String,
}

#[derive(Clone, Debug)]
pub struct StoredVideo {
    pub gs_path: String,
    pub public_url: String,
}

impl VideoStore {
    pub fn new(client: GcsClient, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub async fn store(
        &self,
        animal_id: Uuid,
        file_name: &str,
        data: axum::body::Bytes,
    ) -> Result<StoredVideo, ApiError> {
        if data.len() > MAX_VIDEO_BYTES {
            return Err(ApiError::Validation("video exceeds 500MB limit".to_string()));
        }

        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("mp4");
        let object_name = format!("uploads/{}/{}.{}", animal_id, Uuid::new_v4(), ext);
        let mime_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string();

        let upload_type = UploadType::Simple(Media {
            name: object_name.clone().into(),
            content_type: mime_type.into(),
            content_length: Some(data.len() as u64),
        });

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data,
                &upload_type,
            )
            .await
            .map_err(|e| ApiError::Upstream(format!("video upload failed: {e}")))?;

        let gs_path = format!("gs://{}/{}", self.bucket, object_name);
        let public_url = public_url(&gs_path)
            .ok_or_else(|| ApiError::Internal(format!("malformed object path {gs_path}")))?;

        Ok(StoredVideo { gs_path, public_url })
    }
}

/// Retrievable URL for a stored `gs://bucket/object` path.
pub fn public_url(gs_path: &str) -> Option<String> {
    let (bucket, object) = parse_gs_path(gs_path)?;
    Some(format!("https://storage.googleapis.com/{bucket}/{object}"))
}

/// Splits a `gs://bucket/object` path into (bucket, object).
pub fn parse_gs_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("gs://")?;
    let (bucket, object) = rest.split_once('/')?;
    if bucket.is_empty() || object.is_empty() {
        return None;
    }
    Some((bucket, object))
}
