//! Cloudinary-backed image hosting adapter.
//!
//! Uses the unsigned upload API: the deployment configures a cloud name
//! and an unsigned upload preset, and each upload posts the bytes with a
//! deterministic public id derived from the owning record. The adapter
//! owns transport details only; callers decide what a failed upload means
//! for the owning record.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::domain::ports::{ImageStore, ImageStoreError};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudinary deployment settings.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    /// Cloudinary cloud name.
    pub cloud_name: String,
    /// Unsigned upload preset name.
    pub upload_preset: String,
    /// Optional folder prefix for uploaded assets.
    pub folder: Option<String>,
}

impl CloudinaryConfig {
    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }
}

/// Subset of the Cloudinary upload response we rely on.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Reqwest-based implementation of the image store port.
pub struct CloudinaryImageStore {
    client: Client,
    endpoint: String,
    upload_preset: String,
    folder: Option<String>,
}

impl CloudinaryImageStore {
    /// Build an adapter with a dedicated HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: CloudinaryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            upload_preset: config.upload_preset,
            folder: config.folder,
        })
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, bytes: Vec<u8>, hint: &str) -> Result<String, ImageStoreError> {
        let part = Part::bytes(bytes).file_name("upload");
        let mut form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("public_id", hint.to_owned())
            .part("file", part);
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| ImageStoreError::upload(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageStoreError::upload(format!(
                "upload endpoint returned {status}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| ImageStoreError::upload(format!("decode upload response: {err}")))?;
        Ok(body.secure_url)
    }
}
