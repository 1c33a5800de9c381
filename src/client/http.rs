//! JSON-over-HTTP transport shared by the admin and organization clients.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::ApiError;
use super::models::Envelope;

/// How requests are authenticated.
#[derive(Clone)]
pub(crate) enum Credentials {
    /// `Authorization: Bearer <admin key>`, used by the admin API.
    Bearer(String),
    /// HTTP basic auth with an organization's public/private key pair.
    Basic {
        public_key: String,
        private_key: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { public_key, .. } => f
                .debug_struct("Basic")
                .field("public_key", public_key)
                .field("private_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Sends authenticated JSON requests relative to a base URL.
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    base_url: String,
    credentials: Credentials,
    http: reqwest::Client,
}

impl HttpTransport {
    pub(crate) fn new(http: reqwest::Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            credentials,
            http,
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }

    /// Send a request and decode the JSON response body as `T`.
    pub(crate) async fn send<B, T>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.execute(operation, method, path, body).await?;
        decode(operation, &bytes)
    }

    /// Send a request whose response is a `{success, message}` envelope.
    ///
    /// An empty body counts as success; `success: false` becomes
    /// [`ApiError::Rejected`] carrying the remote message.
    pub(crate) async fn send_acknowledged<B>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = self.execute(operation, method, path, body).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let envelope: Envelope = decode(operation, &bytes)?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: envelope.message,
            })
        }
    }

    async fn execute<B>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!(operation, method = %method, url = %url, "Sending request");

        let mut request = self.http.request(method, &url);
        request = match &self.credentials {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic {
                public_key,
                private_key,
            } => request.basic_auth(public_key, Some(private_key)),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport_error = |error: reqwest::Error| ApiError::Transport {
            operation: operation.to_string(),
            message: error.to_string(),
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let message = error_message(status, &bytes);
        debug!(operation, status = status.as_u16(), message = %message, "Request failed");
        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound { message })
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn decode<T: DeserializeOwned>(operation: &str, bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|error| ApiError::Decode {
        operation: operation.to_string(),
        message: error.to_string(),
    })
}

/// Pull a human readable message out of an error body.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(message)) = map.get(key) {
                if !message.trim().is_empty() {
                    return message.clone();
                }
            }
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("<empty>").to_string()
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    /// Serve `router` on an ephemeral local port and return its base URL.
    pub(crate) async fn spawn(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
