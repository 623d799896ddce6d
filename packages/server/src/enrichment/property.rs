use std::time::Duration;

use async_trait::async_trait;
use common::Resolution;
use serde::Deserialize;
use tracing::{debug, warn};

use super::EnrichmentError;
use crate::config::PropertyRecordsConfig;

/// Finds a deep link into the county property-appraiser site.
#[async_trait]
pub trait PropertyLinker: Send + Sync {
    async fn link_for(&self, formatted_address: &str) -> Resolution<String>;
}

/// Brevard County Property Appraiser records API.
pub struct BcpaoLinker {
    client: reqwest::Client,
    api_url: String,
    link_base: String,
}

impl BcpaoLinker {
    pub fn new(config: &PropertyRecordsConfig) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            link_base: config.link_base.clone(),
        })
    }

    async fn lookup(&self, address: &str) -> Result<Option<String>, EnrichmentError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("address", address)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }

        let records: Vec<PropertyRecord> = response.json().await?;
        Ok(first_account(&records).map(|account| format!("{}{account}", self.link_base)))
    }
}

#[async_trait]
impl PropertyLinker for BcpaoLinker {
    async fn link_for(&self, formatted_address: &str) -> Resolution<String> {
        match self.lookup(formatted_address).await {
            Ok(Some(link)) => Resolution::Resolved(link),
            Ok(None) => {
                debug!(address = formatted_address, "No property record");
                Resolution::Unresolved
            }
            Err(e) => {
                warn!(address = formatted_address, error = %e, "Property record lookup failed");
                Resolution::Unresolved
            }
        }
    }
}

/// The records API returns the account either as a string or a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Account {
    Text(String),
    Number(u64),
}

#[derive(Debug, Deserialize)]
pub struct PropertyRecord {
    pub account: Option<Account>,
}

/// Account id of the first record that has one.
pub fn first_account(records: &[PropertyRecord]) -> Option<String> {
    records.iter().find_map(|r| match r.account.as_ref()? {
        Account::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Account::Text(_) => None,
        Account::Number(n) => Some(n.to_string()),
    })
}
