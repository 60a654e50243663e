use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Identifiers of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobUpload {
    /// Sui object holding the blob, when the publisher reports one.
    pub id: Option<String>,
    pub blob_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Publisher response carried no blob id")]
    MissingBlobId,

    #[error("Upload failed: {0}")]
    Remote(#[from] anyhow::Error),
}

/// Off-chain resolution instructions attached to a market's oracle config.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionPrompt {
    pub title: String,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResolutionPrompt {
    pub fn new(title: &str, prompt: &str) -> Result<Self, UploadError> {
        if prompt.trim().is_empty() {
            return Err(UploadError::EmptyPrompt);
        }

        let title = if title.trim().is_empty() {
            "AI Resolution Prompt"
        } else {
            title
        };

        Ok(Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            timestamp: Utc::now(),
            kind: "ai-resolution".to_string(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, UploadError> {
        let body = serde_json::to_vec_pretty(self).context("Failed to encode prompt")?;
        Ok(body)
    }
}

/// Walrus publisher; the publisher pays for and signs the storage transaction.
pub struct WalrusPublisher {
    client: Client,
    publisher_url: String,
    epochs: u32,
    deletable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreResponse {
    newly_created: Option<NewlyCreated>,
    already_certified: Option<AlreadyCertified>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    id: String,
    blob_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
    #[serde(default)]
    object: Option<String>,
}

impl WalrusPublisher {
    pub fn new(publisher_url: &str, epochs: u32, deletable: bool, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            publisher_url: publisher_url.trim_end_matches('/').to_string(),
            epochs,
            deletable,
        })
    }

    fn store_url(&self) -> String {
        let mut url = format!("{}/v1/blobs?epochs={}", self.publisher_url, self.epochs);
        if self.deletable {
            url.push_str("&deletable=true");
        }
        url
    }

    pub async fn upload(&self, bytes: Vec<u8>) -> Result<BlobUpload, UploadError> {
        let size = bytes.len();
        let response: StoreResponse = self.client
            .put(self.store_url())
            .body(bytes)
            .send()
            .await
            .context("Failed to reach Walrus publisher")?
            .error_for_status()
            .context("Walrus publisher rejected the blob")?
            .json()
            .await
            .context("Failed to parse Walrus publisher response")?;

        let upload = into_upload(response)?;
        info!("Stored {} bytes as blob {}", size, upload.blob_id);
        Ok(upload)
    }

    pub async fn upload_prompt(&self, title: &str, prompt: &str) -> Result<BlobUpload, UploadError> {
        let prompt = ResolutionPrompt::new(title, prompt)?;
        self.upload(prompt.to_bytes()?).await
    }
}

fn into_upload(response: StoreResponse) -> Result<BlobUpload, UploadError> {
    if let Some(created) = response.newly_created {
        return Ok(BlobUpload {
            id: Some(created.blob_object.id),
            blob_id: created.blob_object.blob_id,
        });
    }
    if let Some(certified) = response.already_certified {
        return Ok(BlobUpload {
            id: certified.object,
            blob_id: certified.blob_id,
        });
    }
    Err(UploadError::MissingBlobId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prompt_is_rejected() {
        assert!(matches!(ResolutionPrompt::new("t", "  \n "), Err(UploadError::EmptyPrompt)));
    }

    #[test]
    fn test_prompt_payload_shape() {
        let prompt = ResolutionPrompt::new("", "Resolve YES if BTC >= 100k").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&prompt.to_bytes().unwrap()).unwrap();

        assert_eq!(value["title"], "AI Resolution Prompt");
        assert_eq!(value["type"], "ai-resolution");
        assert_eq!(value["prompt"], "Resolve YES if BTC >= 100k");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_newly_created_response() {
        let json = r#"{"newlyCreated":{"blobObject":{"id":"0xobj","blobId":"B1","size":42},"cost":100}}"#;
        let upload = into_upload(serde_json::from_str(json).unwrap()).unwrap();

        assert_eq!(upload, BlobUpload { id: Some("0xobj".to_string()), blob_id: "B1".to_string() });
    }

    #[test]
    fn test_already_certified_response() {
        let json = r#"{"alreadyCertified":{"blobId":"B2","endEpoch":7}}"#;
        let upload = into_upload(serde_json::from_str(json).unwrap()).unwrap();

        assert_eq!(upload.id, None);
        assert_eq!(upload.blob_id, "B2");
    }

    #[test]
    fn test_store_url() {
        let publisher = WalrusPublisher::new("https://publisher.example/", 3, true, Duration::from_secs(5)).unwrap();
        assert_eq!(publisher.store_url(), "https://publisher.example/v1/blobs?epochs=3&deletable=true");
    }
}
