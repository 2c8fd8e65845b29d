//! [`VaultTransit`]: logical writes against a Vault-compatible HTTP API.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use common::{protocol::ErrorBody, CipherError, TransportError};
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use tracing::debug;

use super::Transit;
use crate::config::TransitConfig;

/// Header carrying the access token.
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Version prefix of every logical path.
const API_VERSION: &str = "v1";

/// Longest raw error body echoed into a [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Authenticated handle to a Vault-compatible service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct VaultTransit {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    addr: String,
    token: String,
    timeout: Duration,
}

impl VaultTransit {
    /// Build a handle for the service at `addr` using `token`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Config`] if `addr` is not an absolute
    /// `http://` or `https://` URL, or if TLS cannot be initialised.
    pub fn with_token(token: impl Into<String>, addr: &str) -> Result<Self, CipherError> {
        let cfg = TransitConfig::new(addr, token);
        let timeout = cfg.timeout();
        Self::new(cfg.token, &cfg.addr, timeout)
    }

    /// Build a handle from a validated [`TransitConfig`].
    pub fn from_config(cfg: &TransitConfig) -> Result<Self, CipherError> {
        cfg.validate()?;
        Self::new(cfg.token.clone(), &cfg.addr, cfg.timeout())
    }

    fn new(token: String, addr: &str, timeout: Duration) -> Result<Self, CipherError> {
        let addr = addr.trim().trim_end_matches('/');
        let uri: Uri = addr
            .parse()
            .map_err(|e| CipherError::Config(format!("invalid service address {addr:?}: {e}")))?;
        if !matches!(uri.scheme_str(), Some("http") | Some("https")) || uri.authority().is_none() {
            return Err(CipherError::Config(format!(
                "service address {addr:?} must be an absolute http:// or https:// URL"
            )));
        }

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| CipherError::Config(format!("failed to initialise TLS: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            addr: addr.to_owned(),
            token,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/{}", self.addr, path.trim_start_matches('/'))
    }

    async fn send(&self, path: &str, body: Value) -> Result<Option<Value>, TransportError> {
        let payload = serde_json::to_vec(&body).map_err(|e| TransportError::Request(e.to_string()))?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.url(path))
            .header(TOKEN_HEADER, self.token.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        debug!(path, status = status.as_u16(), "transit write completed");

        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| TransportError::Body(e.to_string()))
    }
}

#[async_trait]
impl Transit for VaultTransit {
    async fn write(&self, path: &str, body: Value) -> Result<Option<Value>, TransportError> {
        tokio::time::timeout(self.timeout, self.send(path, body))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

impl fmt::Debug for VaultTransit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the token.
        f.debug_struct("VaultTransit")
            .field("addr", &self.addr)
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Map a non-success response to [`TransportError::Status`], keeping the
/// service's own `errors` list, or a prefix of the raw body when it has none.
fn status_error(status: StatusCode, body: &[u8]) -> TransportError {
    let mut errors = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.errors)
        .unwrap_or_default();
    if errors.is_empty() {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        if !text.is_empty() {
            errors.push(text.chars().take(MAX_ERROR_BODY).collect());
        }
    }
    TransportError::Status {
        status: status.as_u16(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
        Json, Router,
    };
    use serde_json::json;

    /// Serve `router` on an ephemeral local port and return its base address.
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn writes_to_versioned_path_with_token() {
        let router = Router::new().route(
            "/v1/transit/encrypt/:key",
            post(
                |Path(key): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let token = headers
                        .get(TOKEN_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_owned();
                    let items = body["batch_input"].as_array().map_or(0, |a| a.len());
                    Json(json!({"data": {"key": key, "token": token, "items": items}}))
                },
            ),
        );
        let addr = spawn(router).await;
        let transit = VaultTransit::with_token("myroot", &format!("{addr}/")).unwrap();

        let resp = transit
            .write(
                "transit/encrypt/my-key",
                json!({"batch_input": [{"plaintext": "", "reference": ""}]}),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resp["data"]["key"], "my-key");
        assert_eq!(resp["data"]["token"], "myroot");
        assert_eq!(resp["data"]["items"], 1);
    }

    #[tokio::test]
    async fn non_success_status_carries_service_errors() {
        let router = Router::new().route(
            "/v1/transit/decrypt/:key",
            post(|| async {
                (
                    AxumStatus::FORBIDDEN,
                    Json(json!({"errors": ["permission denied"]})),
                )
            }),
        );
        let addr = spawn(router).await;
        let transit = VaultTransit::with_token("bad", &addr).unwrap();

        let err = transit
            .write("transit/decrypt/k", json!({}))
            .await
            .unwrap_err();
        match err {
            TransportError::Status { status, errors } => {
                assert_eq!(status, 403);
                assert_eq!(errors, vec!["permission denied".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_content_is_none() {
        let router = Router::new().route(
            "/v1/sys/mounts/transit",
            post(|| async { AxumStatus::NO_CONTENT }),
        );
        let addr = spawn(router).await;
        let transit = VaultTransit::with_token("myroot", &addr).unwrap();
        let resp = transit
            .write("sys/mounts/transit", json!({"type": "transit"}))
            .await
            .unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/v1/transit/encrypt/:key",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );
        let addr = spawn(router).await;
        let transit =
            VaultTransit::new("myroot".into(), &addr, Duration::from_millis(50)).unwrap();
        let err = transit
            .write("transit/encrypt/k", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        // Bind and immediately drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transit = VaultTransit::with_token("myroot", &format!("http://{addr}")).unwrap();
        let err = transit
            .write("transit/encrypt/k", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[test]
    fn rejects_relative_or_foreign_addresses() {
        assert!(matches!(
            VaultTransit::with_token("t", "localhost:8200"),
            Err(CipherError::Config(_))
        ));
        assert!(VaultTransit::with_token("t", "ftp://vault:21").is_err());
        assert!(VaultTransit::with_token("t", "not a url").is_err());
    }

    #[test]
    fn status_error_falls_back_to_raw_body() {
        let e = status_error(StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(matches!(
            e,
            TransportError::Status { status: 502, ref errors } if errors == &vec!["upstream down".to_string()]
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let transit = VaultTransit::with_token("s.supersecret", "http://127.0.0.1:8200").unwrap();
        let out = format!("{transit:?}");
        assert!(out.contains("REDACTED"));
        assert!(!out.contains("supersecret"));
    }
}
