use serde::Deserialize;
use std::time::Duration;

use tlock_age::chain::{Beacon, ChainClient, ChainInfo};
use tlock_age::TLockAgeError;

/// Blocking client for the beacon network HTTP API: `/info` for chain
/// metadata, `/public/<round>` for beacons.
pub struct HttpClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct InfoResponse {
    public_key: String,
    period: u64,
    genesis_time: u64,
    hash: String,
    #[serde(rename = "schemeID")]
    scheme_id: String,
}

#[derive(Deserialize)]
struct BeaconResponse {
    round: u64,
    signature: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("default reqwest client options are valid"),
        }
    }

    fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, TLockAgeError> {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| TLockAgeError::Network(Box::new(e)))
    }
}

impl ChainClient for HttpClient {
    fn chain_info(&self) -> Result<ChainInfo, TLockAgeError> {
        let info: InfoResponse = self.get("info")?;
        let hash = hex::decode(&info.hash).map_err(|e| TLockAgeError::Network(Box::new(e)))?;
        let public_key =
            hex::decode(&info.public_key).map_err(|e| TLockAgeError::Network(Box::new(e)))?;
        Ok(ChainInfo::new(
            &info.scheme_id,
            info.period,
            info.genesis_time,
            &hash,
            &public_key,
        ))
    }

    fn beacon(&self, round: u64) -> Result<Beacon, TLockAgeError> {
        let beacon: BeaconResponse = self.get(&format!("public/{round}"))?;
        let signature =
            hex::decode(&beacon.signature).map_err(|e| TLockAgeError::Network(Box::new(e)))?;
        Ok(Beacon::new(beacon.round, &signature))
    }
}
