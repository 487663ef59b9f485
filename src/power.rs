//! Client for the NASA POWER daily point API.
//!
//! Only the corrected precipitation parameter (`PRECTOTCORR`, mm/day) is requested. The
//! client sits behind [`PrecipitationSource`] so that the pipeline can run against
//! canned data.
use std::{collections::{BTreeMap, HashMap}, time::Duration};

use chrono::NaiveDate;
use serde::Deserialize;

pub const PRECIPITATION_PARAMETER: &str = "PRECTOTCORR";
/// Date format POWER uses for request parameters and response keys
pub const POWER_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, thiserror::Error)]
pub enum PowerApiError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("Failed to parse the POWER response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The POWER response has no {0} parameter")]
    MissingParameter(&'static str),
    #[error("The POWER response has an invalid date key '{0}'")]
    BadDate(String),
}

/// Anything that can provide daily precipitation for a point.
pub trait PrecipitationSource {
    /// Daily precipitation in mm at (`latitude`, `longitude`) for each day from `start`
    /// to `end` inclusive, as delivered (fill values included).
    fn daily_precipitation(&self, latitude: f64, longitude: f64, start: NaiveDate, end: NaiveDate)
        -> Result<BTreeMap<NaiveDate, f64>, PowerApiError>;
}

/// The subset of the POWER JSON response that we use.
#[derive(Debug, Deserialize)]
pub struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

impl PowerResponse {
    /// Extract the precipitation series keyed by date.
    pub fn precipitation(mut self) -> Result<BTreeMap<NaiveDate, f64>, PowerApiError> {
        let series = self.properties.parameter.remove(PRECIPITATION_PARAMETER)
            .ok_or(PowerApiError::MissingParameter(PRECIPITATION_PARAMETER))?;

        series.into_iter()
            .map(|(key, value)| {
                let date = NaiveDate::parse_from_str(&key, POWER_DATE_FORMAT)
                    .map_err(|_| PowerApiError::BadDate(key.clone()))?;
                Ok((date, value))
            })
            .collect()
    }
}

/// Parse the body of a POWER daily point response.
pub fn parse_power_response(body: &str) -> Result<BTreeMap<NaiveDate, f64>, PowerApiError> {
    let resp: PowerResponse = serde_json::from_str(body)?;
    resp.precipitation()
}

/// Blocking HTTP client for the POWER API.
#[derive(Debug, Clone)]
pub struct PowerApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl PowerApiClient {
    /// Create a client that sends requests to `base_url`, giving up on each request after
    /// `timeout_secs` seconds.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, PowerApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, base_url: base_url.to_string() })
    }
}

impl PrecipitationSource for PowerApiClient {
    fn daily_precipitation(&self, latitude: f64, longitude: f64, start: NaiveDate, end: NaiveDate)
        -> Result<BTreeMap<NaiveDate, f64>, PowerApiError> {
        let params = [
            ("parameters", PRECIPITATION_PARAMETER.to_string()),
            ("community", "AG".to_string()),
            ("longitude", longitude.to_string()),
            ("latitude", latitude.to_string()),
            ("start", start.format(POWER_DATE_FORMAT).to_string()),
            ("end", end.format(POWER_DATE_FORMAT).to_string()),
            ("format", "JSON".to_string()),
        ];

        log::debug!("Requesting {} with {params:?}", self.base_url);
        let resp: PowerResponse = self.client.get(&self.base_url)
            .query(&params)
            .send()?
            .error_for_status()?
            .json()?;
        resp.precipitation()
    }
}
