use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{ApiError, ApiTarget};
use crate::config::Config;
use crate::logging::{debug, obj, v_num, v_str, Domain};

/// A request as built by a caller, before credentials and prefix handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: ApiTarget,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<ApiTarget>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<ApiTarget>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<ApiTarget>, body: Value) -> Self {
        Self::new(Method::POST, target).json(body)
    }

    pub fn put(target: impl Into<ApiTarget>, body: Value) -> Self {
        Self::new(Method::PUT, target).json(body)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// What actually goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fails with `ApiError::Status` on a non-2xx response.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError>;
}

pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self, ApiError> {
        let base = Url::parse(&cfg.api_base)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", cfg.api_base, e)))?;
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self { client, base })
    }

    fn absolute(&self, url: &str) -> Result<Url, ApiError> {
        match Url::parse(url) {
            Ok(u) => Ok(u),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base
                .join(url)
                .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e))),
            Err(e) => Err(ApiError::InvalidUrl(format!("{}: {}", url, e))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> Result<ApiResponse, ApiError> {
        let url = self.absolute(&request.url)?;
        let mut builder = self.client.request(request.method.clone(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug(
            Domain::Api,
            "response",
            obj(&[
                ("method", v_str(request.method.as_str())),
                ("url", v_str(url.as_str())),
                ("status", v_num(status as f64)),
            ]),
        );
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_urls_join_base() {
        let transport = HttpTransport::new(&Config::default()).unwrap();
        assert_eq!(
            transport.absolute("/api/personas").unwrap().as_str(),
            "http://localhost:8000/api/personas"
        );
        assert_eq!(
            transport.absolute("https://x.test/y").unwrap().as_str(),
            "https://x.test/y"
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse { status: 204, body: String::new() };
        assert!(ok.error_for_status().is_ok());
        let err = ApiResponse { status: 403, body: "Admin access required".to_string() }
            .error_for_status()
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 403, .. }));
    }
}
