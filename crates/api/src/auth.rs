use crate::{
    Error, ItemsClient, ItemsRequest, Result, SearchResults, client::REQUEST_TIMEOUT,
};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// The default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.os.uk/oauth2/token/v1";

/// OAuth2 client credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// The project client id.
    pub client_id: String,
    /// The project client secret.
    pub client_secret: String,
}

impl Credentials {
    /// Reads `CLIENT_ID` and `CLIENT_SECRET` from the environment.
    ///
    /// Returns `None` when either is unset; a stack built without
    /// credentials still works until the first 401 forces a refresh.
    pub fn from_env() -> Option<Credentials> {
        let client_id = std::env::var("CLIENT_ID").ok()?;
        let client_secret = std::env::var("CLIENT_SECRET").ok()?;
        Some(Credentials {
            client_id,
            client_secret,
        })
    }
}

/// The process-wide bearer-token cell.
///
/// Lives from process start (empty, unless seeded) to process end, and is
/// written only by [Authenticated] when a refresh succeeds. The lock is
/// held across a refresh so two concurrent 401s produce one token fetch,
/// not one each.
#[derive(Clone, Debug, Default)]
pub struct TokenStore(Arc<Mutex<Option<String>>>);

impl TokenStore {
    /// Creates an empty store.
    pub fn new() -> TokenStore {
        TokenStore::default()
    }

    /// Creates a store seeded from the `ACCESS_TOKEN` environment variable,
    /// when set.
    pub fn from_env() -> TokenStore {
        TokenStore(Arc::new(Mutex::new(std::env::var("ACCESS_TOKEN").ok())))
    }

    /// Returns the current token, or the empty string when none has been
    /// stored yet.
    pub async fn get(&self) -> String {
        self.0.lock().await.clone().unwrap_or_default()
    }

    /// Stores a token.
    pub async fn set(&self, token: String) {
        *self.0.lock().await = Some(token);
    }

    /// Replaces a stale token via `fetch`, unless another caller already
    /// replaced it while we were waiting for the lock.
    pub async fn refresh_with<F, Fut>(&self, stale: &str, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut guard = self.0.lock().await;
        if let Some(current) = guard.as_deref() {
            if current != stale {
                return Ok(current.to_string());
            }
        }
        let token = fetch().await?;
        *guard = Some(token.clone());
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetches fresh bearer tokens with the OAuth2 client-credentials grant.
///
/// Tokens expire upstream after about five minutes; nothing here tracks
/// that window, a rejected token is simply refreshed on demand.
#[derive(Clone, Debug)]
pub struct TokenBroker {
    client: reqwest::Client,
    token_url: Url,
    credentials: Option<Credentials>,
}

impl TokenBroker {
    /// Creates a broker against the production token endpoint.
    pub fn new(credentials: Option<Credentials>) -> Result<TokenBroker> {
        TokenBroker::with_token_url(DEFAULT_TOKEN_URL, credentials)
    }

    /// Creates a broker against another token endpoint, e.g. a test double.
    pub fn with_token_url(token_url: &str, credentials: Option<Credentials>) -> Result<TokenBroker> {
        Ok(TokenBroker {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            token_url: Url::parse(token_url)?,
            credentials,
        })
    }

    /// Requests a new access token.
    pub async fn fetch_token(&self) -> Result<String> {
        let Some(credentials) = &self.credentials else {
            return Err(Error::Credentials(
                "missing CLIENT_ID and/or CLIENT_SECRET; make sure these are configured \
                 in your environment"
                    .to_string(),
            ));
        };
        let response = self
            .client
            .post(self.token_url.clone())
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|error| Error::Credentials(format!("token request failed: {error}")))?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Credentials(
                "invalid CLIENT_ID and/or CLIENT_SECRET; make sure these are configured \
                 correctly in your environment"
                    .to_string(),
            ));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|error| Error::Credentials(format!("undecodable token response: {error}")))?;
        Ok(body.access_token)
    }
}

/// Attaches bearer authentication to a client, refreshing the shared token
/// once when the upstream rejects it.
///
/// The first attempt goes out with whatever the store currently holds (the
/// empty string when nothing has been stored). On a 401 the token is
/// refreshed and the call retried exactly once; a second 401 propagates
/// unchanged.
#[derive(Clone, Debug)]
pub struct Authenticated<C> {
    inner: C,
    tokens: TokenStore,
    broker: TokenBroker,
}

impl<C> Authenticated<C> {
    /// Wraps a client with bearer authentication.
    pub fn new(inner: C, tokens: TokenStore, broker: TokenBroker) -> Authenticated<C> {
        Authenticated {
            inner,
            tokens,
            broker,
        }
    }
}

impl<C: ItemsClient> ItemsClient for Authenticated<C> {
    async fn items(&self, request: ItemsRequest) -> Result<SearchResults> {
        let token = self.tokens.get().await;
        let result = self.inner.items(with_bearer(request.clone(), &token)).await;
        if !is_unauthorized(&result) {
            return result;
        }
        tracing::debug!("upstream rejected the access token, refreshing");
        let token = self
            .tokens
            .refresh_with(&token, || self.broker.fetch_token())
            .await?;
        self.inner.items(with_bearer(request, &token)).await
    }
}

fn with_bearer(mut request: ItemsRequest, token: &str) -> ItemsRequest {
    request.set_header("Authorization".to_string(), format!("Bearer {token}"));
    request
}

fn is_unauthorized<T>(result: &Result<T>) -> bool {
    matches!(result, Err(Error::Upstream(payload)) if payload.code == 401)
}
