//! JSON POST helper for the membership endpoints.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// How long an announce or heartbeat may take before it is abandoned.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors from the membership HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Build the client used for membership traffic.
pub(crate) fn membership_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_CLIENT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// POST `payload` as JSON and decode the JSON response.
pub(crate) async fn post_json<P, R>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
) -> Result<R, ClientError>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let response = send(client, url, payload).await?;
    response.json().await.map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

/// POST `payload` as JSON, ignoring the response body.
pub(crate) async fn post_json_discard<P: Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
) -> Result<(), ClientError> {
    send(client, url, payload).await.map(|_| ())
}

async fn send<P: Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &P,
) -> Result<reqwest::Response, ClientError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(ClientError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    Ok(response)
}
