use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("vision request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vision API returned {status}: {body}")]
    Response {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("decoder worker failed: {0}")]
    Worker(String),
}

/// Something that can pull QR text out of image bytes.
///
/// `Ok(None)` means the image was understood but held no QR code.
#[async_trait]
pub trait QrDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn decode(&self, image: &[u8]) -> Result<Option<String>, DecodeError>;
}

/// Decodes in-process with `rqrr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDecoder;

impl LocalDecoder {
    pub fn decode_bytes(image: &[u8]) -> Result<Option<String>, DecodeError> {
        let luma = image::load_from_memory(image)?.to_luma8();
        let (width, height) = luma.dimensions();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });

        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_, content)) => return Ok(Some(content)),
                Err(e) => debug!(error = ?e, "Skipping undecodable QR grid"),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl QrDecoder for LocalDecoder {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn decode(&self, image: &[u8]) -> Result<Option<String>, DecodeError> {
        let bytes = image.to_vec();
        actix_web::web::block(move || Self::decode_bytes(&bytes))
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))?
    }
}

/// Google Cloud Vision barcode detection, used when local decoding finds
/// nothing.
#[derive(Clone, Debug)]
pub struct CloudVisionDecoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CloudVisionDecoder {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, DecodeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("attendance/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn request_body(image: &[u8]) -> Value {
        json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [{ "type": "BARCODE_DETECTION", "maxResults": 5 }]
            }]
        })
    }
}

/// First non-empty `rawValue` among the barcode annotations of the first
/// response.
pub(crate) fn first_barcode(response: &Value) -> Option<String> {
    response
        .get("responses")?
        .get(0)?
        .get("barcodeAnnotations")?
        .as_array()?
        .iter()
        .filter_map(|annotation| annotation.get("rawValue").and_then(Value::as_str))
        .map(str::trim)
        .find(|raw| !raw.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl QrDecoder for CloudVisionDecoder {
    fn name(&self) -> &'static str {
        "cloud-vision"
    }

    async fn decode(&self, image: &[u8]) -> Result<Option<String>, DecodeError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(image))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DecodeError::Response { status, body });
        }

        let body: Value = resp.json().await?;
        Ok(first_barcode(&body))
    }
}

/// Tries each decoder in turn and keeps the first text found. A failing
/// decoder is logged and skipped.
pub struct DecoderChain {
    decoders: Vec<Box<dyn QrDecoder>>,
}

impl DecoderChain {
    pub fn new(decoders: Vec<Box<dyn QrDecoder>>) -> Self {
        Self { decoders }
    }

    /// Local decoding always; the cloud fallback only with an API key.
    pub fn from_config(config: &Config) -> Result<Self, DecodeError> {
        let mut decoders: Vec<Box<dyn QrDecoder>> = vec![Box::new(LocalDecoder)];
        if let Some(key) = &config.google_api_key {
            decoders.push(Box::new(CloudVisionDecoder::new(
                config.vision_endpoint.clone(),
                key.clone(),
            )?));
        }
        Ok(Self::new(decoders))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    pub async fn decode(&self, image: &[u8]) -> Option<String> {
        for decoder in &self.decoders {
            match decoder.decode(image).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!(decoder = decoder.name(), "QR payload decoded");
                    return Some(text);
                }
                Ok(_) => debug!(decoder = decoder.name(), "No QR code found"),
                Err(e) => warn!(decoder = decoder.name(), error = %e, "QR decoder failed"),
            }
        }
        None
    }
}
