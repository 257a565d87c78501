use reqwest::{Client, Response, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, error};

use super::cluster::NodeGroup;

/// Remote call failure. Non-2xx answers keep the raw status and body so
/// scenarios can assert on them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid node url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {body}")]
    Status {
        status: StatusCode,
        url: Url,
        body: String,
    },
    #[error("failed to decode {status} response from {url}: {source}; body: {body}")]
    Decode {
        status: StatusCode,
        url: Url,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no {} configured", group.label())]
    NoNodes { group: NodeGroup },
    #[error("all {} failed ({} errors), first: {}", group.label(), errors.len(), first_error(errors))]
    AllFailed {
        group: NodeGroup,
        errors: Vec<ApiError>,
    },
}

fn first_error(errors: &[ApiError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl ApiError {
    /// The most telling single failure: a client error answered by some node
    /// wins over server errors, which win over transport failures.
    #[must_use]
    pub fn primary(&self) -> &Self {
        let Self::AllFailed { errors, .. } = self else {
            return self;
        };
        let leaves = || errors.iter().map(Self::primary);
        leaves()
            .find(|err| err.is_client_error())
            .or_else(|| leaves().find(|err| err.status().is_some()))
            .or_else(|| leaves().next())
            .unwrap_or(self)
    }

    /// HTTP status of the node that answered, if any did.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self.primary() {
            Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }

    /// Raw response body, when a node answered.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self.primary() {
            Self::Status { body, .. } | Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Decoded answer together with the status it came with.
#[derive(Clone, Debug)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub value: T,
}

impl<T> Reply<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Thin async JSON client for one node.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    /// Construct from a base URL such as `http://host:7071/miner01`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> Result<Self, ApiError> {
        // Paths are joined relative to the base, which needs a trailing slash
        // to keep its last segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|err| ApiError::InvalidUrl {
            url: base_url.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Self { base_url, client })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET and decode JSON.
    pub async fn get_json<T>(&self, path: &str) -> Result<Reply<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_json_query(path, &[]).await
    }

    /// GET with query parameters and decode JSON.
    pub async fn get_json_query<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Reply<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.join_base(path);
        debug!(%url, ?query, "GET");
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;
        decode(response).await
    }

    /// POST JSON and decode the answer.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<Reply<T>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.join_base(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;
        decode(response).await
    }

    fn join_base(&self, path: &str) -> Url {
        Self::join_url(&self.base_url, path)
    }

    fn join_url(base: &Url, path: &str) -> Url {
        let trimmed = path.trim_start_matches('/');
        match base.join(trimmed) {
            Ok(url) => url,
            Err(err) => {
                error!(
                    error = %err,
                    base = %base,
                    path,
                    "failed to join url; falling back to base url"
                );
                base.clone()
            }
        }
    }
}

async fn decode<T>(response: Response) -> Result<Reply<T>, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

    if !status.is_success() {
        return Err(ApiError::Status { status, url, body });
    }

    match serde_json::from_str(&body) {
        Ok(value) => Ok(Reply { status, value }),
        Err(source) => Err(ApiError::Decode {
            status,
            url,
            body,
            source,
        }),
    }
}
