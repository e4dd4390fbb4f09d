//! Executes model-generated API calls.

use super::state::ApiCall;
use crate::config::CryptoSettings;
use crate::error::{CogitoError, Result};
use crate::openai::env_value;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// HTTP client for the market data API.
pub struct ApiClient {
    client: reqwest::Client,
    /// Host the API key belongs to; it is never sent anywhere else.
    api_host: Option<String>,
    api_key: Option<(HeaderName, HeaderValue)>,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_host: None,
            api_key: None,
        })
    }

    /// Send `key` in `header` on requests to the host of `api_base`.
    pub fn with_api_key(mut self, api_base: &str, header: &str, key: &str) -> Result<Self> {
        let host = Url::parse(api_base)?
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| CogitoError::Config(format!("API base has no host: {}", api_base)))?;
        let name = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| CogitoError::Config(format!("Invalid API key header '{}': {}", header, e)))?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| CogitoError::Config(format!("Invalid API key: {}", e)))?;
        value.set_sensitive(true);

        self.api_host = Some(host);
        self.api_key = Some((name, value));
        Ok(self)
    }

    /// Client from the `[crypto]` settings, picking up the optional key from the environment.
    pub fn from_settings(settings: &CryptoSettings) -> Result<Self> {
        let client = Self::new(Duration::from_secs(settings.request_timeout_secs))?;
        match env_value(&settings.api_key_env) {
            Some(key) => client.with_api_key(&settings.api_base, &settings.api_key_header, &key),
            None => Ok(client),
        }
    }

    /// Perform `call` and return the JSON response body.
    ///
    /// Error statuses with a JSON body are returned as data so the model can
    /// read them; a body that is not JSON is an error.
    #[instrument(skip(self, call), fields(method = %call.method, url = %call.url))]
    pub async fn execute(&self, call: &ApiCall) -> Result<Value> {
        let url = Url::parse(&call.url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CogitoError::ApiCall(format!("Unsupported URL scheme: {}", url.scheme())));
        }
        let method = Method::from_bytes(call.method.trim().to_uppercase().as_bytes())
            .map_err(|_| CogitoError::ApiCall(format!("Invalid HTTP method: {}", call.method)))?;

        let attach_key = self.api_host.is_some() && url.host_str() == self.api_host.as_deref();

        let mut request = self.client.request(method, url);
        for (name, value) in &call.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let (true, Some((name, value))) = (attach_key, &self.api_key) {
            let overridden = call.headers.keys().any(|h| h.eq_ignore_ascii_case(name.as_str()));
            if !overridden {
                request = request.header(name.clone(), value.clone());
            }
        }
        if !call.body.is_empty() {
            request = request.form(&call.form_fields());
        }

        info!("Calling API");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("API answered with HTTP {}", status);
        }

        serde_json::from_str(&text).map_err(|_| {
            let preview: String = text.chars().take(200).collect();
            CogitoError::ApiCall(format!("HTTP {} returned a non-JSON body: {}", status, preview))
        })
    }
}
