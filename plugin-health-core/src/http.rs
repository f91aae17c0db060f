//! Shared blocking HTTP plumbing.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{HealthError, Result};

pub(crate) fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|err| HealthError::Http(format!("http client setup failed: {err}")))
}

pub(crate) fn request_error(what: &str, err: reqwest::Error) -> HealthError {
    if err.is_timeout() {
        HealthError::Timeout(format!("{what} request timed out: {err}"))
    } else {
        HealthError::Http(format!("{what} request failed: {err}"))
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(what: &str, response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        let message = format!("{what} api error ({status}): {body}");
        return Err(if status == StatusCode::NOT_FOUND {
            HealthError::NotFound(message)
        } else {
            HealthError::Http(message)
        });
    }
    response
        .json()
        .map_err(|err| HealthError::Http(format!("{what} response decode failed: {err}")))
}
