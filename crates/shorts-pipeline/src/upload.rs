//! YouTube uploader.
//!
//! Multipart insert against the YouTube Data API. The HTTP client and the
//! bearer token are built lazily on the first publish, so runs that never
//! reach the upload stage work without any credential configured.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::ports::{UploadRequest, Uploader};

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=multipart&part=snippet,status";

struct Session {
    client: Client,
    token: String,
}

/// Uploader publishing composed segments as YouTube Shorts.
pub struct YouTubeUploader {
    token_env: String,
    session: OnceCell<Session>,
}

impl YouTubeUploader {
    /// `token_env` names the environment variable holding the bearer token.
    pub fn new(token_env: impl Into<String>) -> Self {
        Self {
            token_env: token_env.into(),
            session: OnceCell::new(),
        }
    }

    async fn session(&self) -> PipelineResult<&Session> {
        self.session
            .get_or_try_init(|| async {
                let token = std::env::var(&self.token_env).map_err(|_| {
                    PipelineError::upload_failed(format!("{} not set", self.token_env))
                })?;
                debug!("Upload session initialized");
                Ok(Session {
                    client: Client::new(),
                    token,
                })
            })
            .await
    }
}

#[async_trait]
impl Uploader for YouTubeUploader {
    async fn publish(&self, request: &UploadRequest) -> PipelineResult<String> {
        let session = self.session().await?;

        info!("Uploading {}", request.path.display());
        let bytes = tokio::fs::read(&request.path).await?;
        let file_name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let metadata = Part::text(metadata_json(request).to_string())
            .mime_str("application/json")
            .map_err(|e| PipelineError::upload_failed(e.to_string()))?;
        let media = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(|e| PipelineError::upload_failed(e.to_string()))?;
        let form = Form::new().part("snippet", metadata).part("media", media);

        let response = session
            .client
            .post(UPLOAD_URL)
            .bearer_auth(&session.token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PipelineError::upload_failed(format!(
                "API returned {status}: {body}"
            )));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| PipelineError::upload_failed(format!("unreadable response: {e}")))?;
        let id = parsed["id"]
            .as_str()
            .ok_or_else(|| PipelineError::upload_failed("response missing video id"))?
            .to_string();

        info!("Uploaded as https://www.youtube.com/watch?v={id}");
        Ok(id)
    }
}

fn metadata_json(request: &UploadRequest) -> Value {
    json!({
        "snippet": {
            "title": request.title,
            "description": request.description,
            "tags": request.tags,
            "categoryId": request.category_id,
        },
        "status": {
            "privacyStatus": request.privacy_status,
            "selfDeclaredMadeForKids": false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request() -> UploadRequest {
        UploadRequest {
            path: PathBuf::from("processed/abc_part000_edited.mp4"),
            title: "Clip - Part 1 #shorts".to_string(),
            description: "Clip (Part 1/3)".to_string(),
            tags: vec!["shorts".to_string(), "clips".to_string()],
            category_id: "24".to_string(),
            privacy_status: "public".to_string(),
        }
    }

    #[test]
    fn test_metadata_shape() {
        let value = metadata_json(&request());
        assert_eq!(value["snippet"]["title"], "Clip - Part 1 #shorts");
        assert_eq!(value["snippet"]["categoryId"], "24");
        assert_eq!(value["snippet"]["tags"][1], "clips");
        assert_eq!(value["status"]["privacyStatus"], "public");
        assert_eq!(value["status"]["selfDeclaredMadeForKids"], false);
    }

    #[tokio::test]
    async fn test_missing_token_surfaces_as_upload_error() {
        let uploader = YouTubeUploader::new("SHORTS_TEST_TOKEN_THAT_IS_NOT_SET");
        let err = uploader.publish(&request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::UploadFailed(_)));
    }
}
