use ngd_api::{ApiClient, Credentials, TokenBroker, TokenStore, VersionResolver};

/// Facade configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root of the upstream features API.
    pub base_url: String,

    /// OAuth2 token endpoint.
    pub token_url: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            base_url: ngd_api::DEFAULT_BASE_URL.to_string(),
            token_url: ngd_api::DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl Config {
    /// Builds the shared state: one API client, one version resolver, the
    /// process-wide token store (seeded from `ACCESS_TOKEN` when set), and
    /// a token broker using `CLIENT_ID`/`CLIENT_SECRET` from the
    /// environment.
    pub fn build_state(&self) -> ngd_api::Result<AppState> {
        let client = ApiClient::with_base_url(&self.base_url)?;
        let resolver = client.resolver()?;
        Ok(AppState {
            client,
            resolver,
            tokens: TokenStore::from_env(),
            broker: TokenBroker::with_token_url(&self.token_url, Credentials::from_env())?,
        })
    }
}

/// Shared state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) client: ApiClient,
    pub(crate) resolver: VersionResolver,
    pub(crate) tokens: TokenStore,
    pub(crate) broker: TokenBroker,
}

impl AppState {
    /// Wraps a client with bearer authentication against the shared token
    /// store.
    pub(crate) fn authenticated<C: ngd_api::ItemsClient>(
        &self,
        inner: C,
    ) -> ngd_api::Authenticated<C> {
        ngd_api::Authenticated::new(inner, self.tokens.clone(), self.broker.clone())
    }

    /// Wraps a client with multi-collection fan-out against the shared
    /// resolver.
    pub(crate) fn multi_collection<C: ngd_api::ItemsClient>(
        &self,
        inner: C,
    ) -> ngd_api::MultiCollection<C> {
        ngd_api::MultiCollection::new(inner, self.resolver.clone())
    }
}
