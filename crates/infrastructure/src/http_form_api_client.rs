use std::path::PathBuf;
use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use seva_application::SessionStore;
use seva_core::{AppError, AppResult};
use url::Url;

mod content;
mod remote_checks;
mod submission;


/// reqwest adapter for every remote port of the form engine.
///
/// Requests carry the stored bearer token; a 401 answer clears the session
/// store and surfaces as [`AppError::Unauthorized`].
#[derive(Clone)]
pub struct HttpFormApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    session_store: Arc<dyn SessionStore>,
}

impl HttpFormApiClient {
    /// Creates a client rooted at the backend base URL.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: Url,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            session_store,
        }
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|error| AppError::Internal(format!("invalid endpoint '{path}': {error}")))
    }

    async fn get(&self, path: &str) -> AppResult<reqwest::RequestBuilder> {
        let endpoint = self.endpoint(path)?;
        self.authorize(self.http_client.get(endpoint)).await
    }

    async fn post(&self, path: &str) -> AppResult<reqwest::RequestBuilder> {
        let endpoint = self.endpoint(path)?;
        self.authorize(self.http_client.post(endpoint)).await
    }

    async fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> AppResult<reqwest::RequestBuilder> {
        Ok(match self.session_store.load().await? {
            Some(identity) if !identity.token().is_empty() => builder.bearer_auth(identity.token()),
            _ => builder,
        })
    }

    /// Sends a request and decodes its JSON body.
    async fn send_json<T>(&self, path: &str, builder: reqwest::RequestBuilder) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await.map_err(|error| {
            AppError::Remote(format!("failed to call '{path}': {error}"))
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Err(error) = self.session_store.clear().await {
                tracing::warn!(error = %error, "failed to clear rejected session");
            }
            tracing::warn!(endpoint = path, "backend rejected the session token");
            return Err(AppError::Unauthorized(format!(
                "'{path}' rejected the session token"
            )));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Remote(format!(
                "'{path}' returned status {}: {body}",
                status.as_u16()
            )));
        }

        response.json::<T>().await.map_err(|error| {
            AppError::Remote(format!("failed to parse '{path}' response body: {error}"))
        })
    }
}

/// Reads a picked file into a multipart part.
async fn file_part(
    uri: &str,
    file_name: String,
    mime_type: &str,
) -> AppResult<reqwest::multipart::Part> {
    let path = local_path(uri)?;
    let bytes = tokio::fs::read(&path).await.map_err(|error| {
        AppError::NotFound(format!("failed to read '{}': {error}", path.display()))
    })?;

    reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_type)
        .map_err(|error| AppError::Validation(format!("invalid MIME type '{mime_type}': {error}")))
}

fn local_path(uri: &str) -> AppResult<PathBuf> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|()| AppError::Validation(format!("'{uri}' is not a local file URI"))),
        _ => Ok(PathBuf::from(uri)),
    }
}
