//! Client for the S3-compatible gateway.
//!
//! The gateway takes its action and arguments as query parameters and answers
//! 200 on success and 500 on any failure, including missing parameters and
//! unknown buckets. Responses are returned as-is; scenarios interpret them.

use bytes::Bytes;
use reqwest::{
    Client, StatusCode, Url,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use testing_framework_config::Zs3Config;
use thiserror::Error;
use tracing::debug;

pub const CREATE_BUCKET: &str = "createBucket";
pub const LIST_BUCKETS: &str = "listBuckets";
pub const LIST_OBJECTS: &str = "listObjects";
pub const PUT_OBJECT: &str = "putObject";
pub const REMOVE_OBJECT: &str = "removeObject";

#[derive(Debug, Error)]
pub enum Zs3Error {
    #[error("invalid gateway url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("gateway request {action} failed: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Status and raw body of a gateway answer.
#[derive(Clone, Debug)]
pub struct Zs3Response {
    pub status: StatusCode,
    pub body: String,
}

impl Zs3Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Clone, Debug)]
pub struct Zs3Client {
    client: Client,
    url: Url,
    access_key: String,
    secret_key: String,
}

impl Zs3Client {
    pub fn new(config: &Zs3Config) -> Result<Self, Zs3Error> {
        let url = Url::parse(&config.server_url).map_err(|err| Zs3Error::InvalidUrl {
            url: config.server_url.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            url,
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<Zs3Response, Zs3Error> {
        self.call(CREATE_BUCKET, &[("bucketName", bucket)]).await
    }

    pub async fn list_buckets(&self) -> Result<Zs3Response, Zs3Error> {
        self.call(LIST_BUCKETS, &[]).await
    }

    pub async fn list_objects(&self, bucket: &str) -> Result<Zs3Response, Zs3Error> {
        self.call(LIST_OBJECTS, &[("bucketName", bucket)]).await
    }

    pub async fn remove_object(&self, bucket: &str, object: &str) -> Result<Zs3Response, Zs3Error> {
        self.call(REMOVE_OBJECT, &[("bucketName", bucket), ("objectName", object)])
            .await
    }

    /// Uploads `body` as the multipart field `file`.
    pub async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        body: impl Into<Bytes>,
    ) -> Result<Zs3Response, Zs3Error> {
        let body: Bytes = body.into();
        let part = Part::bytes(body.to_vec()).file_name(object.to_owned());
        let form = Form::new().part("file", part);
        let request = self
            .client
            .post(self.url.clone())
            .query(&self.query(PUT_OBJECT, &[("bucketName", bucket), ("objectName", object)]))
            .multipart(form);
        send(PUT_OBJECT, request).await
    }

    /// Issues `action` with the credentials plus `params`. Used directly for
    /// negative cases such as missing parameters.
    pub async fn call(&self, action: &str, params: &[(&str, &str)]) -> Result<Zs3Response, Zs3Error> {
        let request = self
            .client
            .get(self.url.clone())
            .query(&self.query(action, params));
        send(action, request).await
    }

    fn query<'a>(&'a self, action: &'a str, params: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut query = vec![
            ("action", action),
            ("accessKey", self.access_key.as_str()),
            ("secretAccessKey", self.secret_key.as_str()),
        ];
        query.extend_from_slice(params);
        query
    }
}

async fn send(action: &str, request: reqwest::RequestBuilder) -> Result<Zs3Response, Zs3Error> {
    let transport = |source| Zs3Error::Transport {
        action: action.to_owned(),
        source,
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    debug!(action, %status, "gateway answered");
    Ok(Zs3Response { status, body })
}
