//! HTTP client infrastructure for both native and WASM targets.
//!
//! The device answers every endpoint with a text body (plain text or JSON),
//! so the client only needs a text GET. It uses gloo-net in the browser and
//! reqwest natively.

use std::future::Future;

/// Generic error type for HTTP client operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),
    /// Failed to read the response body
    #[error("Parse error: {0}")]
    Parse(String),
    /// Connection failed
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request timed out
    #[error("Timeout")]
    Timeout,
    /// Server returned an error status
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

/// Anything that can GET a path and return the body as text.
///
/// Implemented by [`HttpClient`]; tests substitute scripted transports.
pub trait TextTransport {
    fn get_text(&self, path: &str) -> impl Future<Output = Result<String, HttpClientError>>;
}

// Platform-specific implementations
#[cfg(target_arch = "wasm32")]
mod platform {
    use super::*;

    impl From<gloo_net::Error> for HttpClientError {
        fn from(err: gloo_net::Error) -> Self {
            HttpClientError::Http(err.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct HttpClient {
        base_url: String,
    }

    impl HttpClient {
        pub fn new(base_url: &str) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    impl TextTransport for HttpClient {
        async fn get_text(&self, path: &str) -> Result<String, HttpClientError> {
            use gloo_net::http::Request;

            let url = format!("{}{}", self.base_url, path);
            let response = Request::get(&url).send().await?;

            if !response.ok() {
                return Err(HttpClientError::ServerError {
                    status: response.status(),
                    message: response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string()),
                });
            }

            response
                .text()
                .await
                .map_err(|e| HttpClientError::Parse(e.to_string()))
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod platform {
    use super::*;

    impl From<reqwest::Error> for HttpClientError {
        fn from(err: reqwest::Error) -> Self {
            if err.is_timeout() {
                HttpClientError::Timeout
            } else if err.is_connect() {
                HttpClientError::Connection(err.to_string())
            } else {
                HttpClientError::Http(err.to_string())
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct HttpClient {
        base_url: String,
        client: reqwest::Client,
    }

    impl PartialEq for HttpClient {
        fn eq(&self, other: &Self) -> bool {
            self.base_url == other.base_url
        }
    }

    impl HttpClient {
        pub fn new(base_url: &str) -> Self {
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: reqwest::Client::new(),
            }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    impl TextTransport for HttpClient {
        async fn get_text(&self, path: &str) -> Result<String, HttpClientError> {
            let url = format!("{}{}", self.base_url, path);
            let response = self.client.get(&url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(HttpClientError::ServerError {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .text()
                .await
                .map_err(|e| HttpClientError::Parse(e.to_string()))
        }
    }
}

// Re-export the platform-specific HttpClient
pub use platform::HttpClient;
