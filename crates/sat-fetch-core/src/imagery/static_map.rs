use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::trace;

use super::source::ImageSource;
use crate::config::{AccessToken, AppConfig};
use crate::error::{Error, FetchError};

/// Static-map HTTP image source:
/// `GET {api_base}/styles/v1/{style}/static/{lon},{lat},{zoom}/{size}?access_token={token}`
pub struct StaticImageSource {
    client: Client,
    api_base: String,
    style_id: String,
    zoom: u8,
    image_size: String,
    access_token: AccessToken,
}

impl StaticImageSource {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            style_id: config.style_id.clone(),
            zoom: config.zoom,
            image_size: config.image_size.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Path and query for a coordinate, without the credential.
    fn request_path(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/styles/v1/{}/static/{},{},{}/{}",
            self.api_base, self.style_id, lon, lat, self.zoom, self.image_size
        )
    }

    pub fn request_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}?access_token={}",
            self.request_path(lat, lon),
            self.access_token.expose()
        )
    }
}

impl ImageSource for StaticImageSource {
    fn fetch(&self, lat: f64, lon: f64) -> Result<Bytes, FetchError> {
        trace!("GET {}", self.request_path(lat, lon));
        let response = self.client.get(self.request_url(lat, lon)).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .map_err(|err| if err.is_timeout() { FetchError::Timeout } else { FetchError::Body(err.to_string()) })
    }
}
