use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{PinProvider, PinRecord, PinServiceError, PinStatus};

/// Client for a remote pin-tracking service speaking the common
/// `pins/…` HTTP shape with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpPinService {
    base: Url,
    token: String,
    http: reqwest::Client,
}

// The service's JSON shape for a pin record
#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    requestid: String,
    status: PinStatus,
    pin: PinSpec,
    #[serde(default)]
    delegates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PinSpec {
    cid: String,
}

impl From<StatusResponse> for PinRecord {
    fn from(resp: StatusResponse) -> Self {
        PinRecord {
            id: resp.requestid,
            status: resp.status,
            cid: resp.pin.cid,
            delegates: resp.delegates,
        }
    }
}

impl HttpPinService {
    pub fn new(base: &str, token: &str) -> Result<Self, PinServiceError> {
        Ok(HttpPinService {
            base: Url::parse(base)?,
            token: token.to_string(),
            http: reqwest::Client::new(),
        })
    }

    fn pins_url(&self, pin_id: Option<&str>) -> Result<Url, PinServiceError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PinServiceError::Default(anyhow!("pin service url cannot be a base")))?;
            segments.pop_if_empty().push("pins");
            if let Some(pin_id) = pin_id {
                segments.push(pin_id);
            }
        }
        Ok(url)
    }

    async fn read_record(
        &self,
        resp: reqwest::Response,
        pin_id: &str,
    ) -> Result<PinRecord, PinServiceError> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PinServiceError::NotFound(pin_id.to_string()));
        }
        if !status.is_success() {
            return Err(PinServiceError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json::<StatusResponse>().await?.into())
    }
}

#[async_trait]
impl PinProvider for HttpPinService {
    async fn status_by_id(&self, pin_id: &str) -> Result<PinRecord, PinServiceError> {
        let url = self.pins_url(Some(pin_id))?;
        tracing::debug!("pin status lookup: {url}");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.read_record(resp, pin_id).await
    }

    async fn submit(&self, pin_id: Option<&str>, cid: &str) -> Result<PinRecord, PinServiceError> {
        let url = self.pins_url(pin_id)?;
        tracing::debug!("pin submit for {cid}: {url}");
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&PinSpec {
                cid: cid.to_string(),
            })
            .send()
            .await?;
        self.read_record(resp, pin_id.unwrap_or(cid)).await
    }
}
