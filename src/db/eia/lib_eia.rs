// Client for the EIA open data API, v2.
// https://www.eia.gov/opendata/documentation.php

use std::env;

use log::{debug, error, info};
use reqwest::{
    blocking::{Client, Request},
    StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{config::Config, error::EtlError};

/// Name of the environment variable with the API key.
pub const API_KEY_VAR: &str = "EIA_API_KEY";

/// One observation as returned by the API.  The API returns prices as
/// strings, and sometimes as the literal string "None", so `price` and
/// `period` are kept as raw json values until the cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub period: Option<Value>,
    #[serde(default)]
    pub stateid: Option<String>,
    #[serde(default, rename = "sectorName")]
    pub sector_name: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default, rename = "price-units")]
    pub price_units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Payload,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    data: Vec<RawRecord>,
}

/// Something that can get the raw records for one state, optionally
/// starting from a given period.
pub trait RecordFetcher {
    fn fetch(&self, state: &str, start: Option<&str>) -> Result<Vec<RawRecord>, EtlError>;
}

pub struct EiaClient {
    client: Client,
    base_url: String,
    frequency: String,
    length: u32,
    api_key: Option<String>,
}

impl EiaClient {
    pub fn new(config: &Config, api_key: Option<String>) -> EiaClient {
        EiaClient {
            client: Client::new(),
            base_url: config.api.base_url.clone(),
            frequency: config.api.frequency.clone(),
            length: config.batch_settings.length,
            api_key,
        }
    }

    /// Take the API key from the environment.  It is not validated, an
    /// expired key only shows up as non-200 responses.
    pub fn from_env(config: &Config) -> EiaClient {
        EiaClient::new(config, env::var(API_KEY_VAR).ok())
    }

    /// Build the GET request for one state.  If `start` is set, only
    /// periods on or after it are requested.
    pub fn request(&self, state: &str, start: Option<&str>) -> Result<Request, EtlError> {
        let mut params: Vec<(&str, String)> = Vec::with_capacity(6);
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params.push(("frequency", self.frequency.clone()));
        params.push(("data[0]", "price".to_string()));
        params.push(("facets[stateid][]", state.to_string()));
        params.push(("length", self.length.to_string()));
        if let Some(start) = start {
            params.push(("start", start.to_string()));
        }
        Ok(self.client.get(&self.base_url).query(&params).build()?)
    }
}

impl RecordFetcher for EiaClient {
    fn fetch(&self, state: &str, start: Option<&str>) -> Result<Vec<RawRecord>, EtlError> {
        let request = self.request(state, start)?;
        let response = self.client.execute(request)?;
        let status = response.status();
        let body = response.text()?;
        let records = records_from_response(state, status, &body)?;
        info!("Got {} records for state {}", records.len(), state);
        Ok(records)
    }
}

/// Extract the records nested in `response.data`.  A non-200 status is
/// logged and gives no records, it doesn't fail the run.
pub fn records_from_response(
    state: &str,
    status: StatusCode,
    body: &str,
) -> Result<Vec<RawRecord>, EtlError> {
    if status != StatusCode::OK {
        error!("Error fetching {}: {}", state, status.as_u16());
        debug!("Response body: {}", body);
        return Ok(Vec::new());
    }
    let envelope: Envelope = serde_json::from_str(body)?;
    Ok(envelope.response.data)
}
