//! Reachability probes for external URLs.

use std::cell::RefCell;
use std::collections::HashMap;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::config::ExternalSettings;
use crate::error::Error;
use crate::types::Status;

/// Blocking HEAD prober. One request per distinct URL per run, no retries.
pub struct Prober {
    /// Results already obtained in this run.
    cache: RefCell<HashMap<String, Status>>,
    client: Client,
}

impl Prober {
    /// Build a prober with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns `Error::HttpClient` if the TLS backend cannot be initialized.
    pub fn new(settings: &ExternalSettings) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| return Error::HttpClient { reason: e.to_string() })?;
        return Ok(Self { cache: RefCell::new(HashMap::new()), client });
    }

    /// Probe a URL. 404 is `ExternalNotFound`; a timeout or connection failure
    /// is `ExternalUnreachable`; any other answer is `Valid`.
    pub fn probe(&self, url: &str) -> Status {
        if let Some(status) = self.cache.borrow().get(url) {
            return *status;
        }

        let status = match self.client.head(url).send() {
            Err(e) => {
                tracing::debug!(url, error = %e, "external link unreachable");
                Status::ExternalUnreachable
            },
            Ok(response) if response.status() == StatusCode::NOT_FOUND => Status::ExternalNotFound,
            Ok(_) => Status::Valid,
        };
        self.cache.borrow_mut().insert(url.to_string(), status);
        return status;
    }
}
