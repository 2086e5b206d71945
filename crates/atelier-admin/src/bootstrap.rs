//! Bootstrap-time wiring of the admin console services.

use std::sync::Arc;

use atelier_auth::{
    AuthTokenStore, CsrfTokenCache, CsrfTokenFetcher, TokenStorage, TokenSubscription,
};
use atelier_client::{
    ApiClient, ApiClientConfig, ApiClientError, ClearTokenOnUnauthorized, HttpCsrfFetcher,
    HttpSessionProbe, HttpTransport, ReqwestTransport, normalize_base_url,
};

use crate::controller::ModeController;
use crate::ports::{ConfirmationPort, NavigationPort};

/// Bootstrap inputs for one tab of the admin console.
pub struct AdminRuntimeOptions {
    pub api: ApiClientConfig,
    pub initial_url: String,
}

/// Long-lived service graph for one tab of the admin console.
///
/// Everything is constructed once here and passed by injection from then
/// on; no service is reachable as ambient state.
pub struct AdminRuntime {
    pub token_store: AuthTokenStore,
    pub client: ApiClient,
    pub controller: ModeController,
    // Held so credential changes keep invalidating the controller's
    // cached session for the lifetime of the runtime.
    _token_subscription: TokenSubscription,
}

/// Wire the full service graph over the production reqwest transport.
pub fn bootstrap(
    options: AdminRuntimeOptions,
    storage: Arc<dyn TokenStorage>,
    confirmation: Arc<dyn ConfirmationPort>,
    navigation: Arc<dyn NavigationPort>,
) -> Result<AdminRuntime, ApiClientError> {
    let transport: Arc<dyn HttpTransport> =
        Arc::new(ReqwestTransport::new(options.api.timeout_ms)?);
    bootstrap_with_transport(options, storage, confirmation, navigation, transport)
}

/// Same wiring with an injected transport, for tests and alternate hosts.
pub fn bootstrap_with_transport(
    options: AdminRuntimeOptions,
    storage: Arc<dyn TokenStorage>,
    confirmation: Arc<dyn ConfirmationPort>,
    navigation: Arc<dyn NavigationPort>,
    transport: Arc<dyn HttpTransport>,
) -> Result<AdminRuntime, ApiClientError> {
    let token_store = AuthTokenStore::new(storage);

    let base_url = normalize_base_url(&options.api.base_url)?;
    let csrf_url = join_endpoint(&base_url, &options.api.csrf_token_path);
    let fetcher = HttpCsrfFetcher::new(Arc::clone(&transport), csrf_url)
        .with_bearer_provider(Arc::new(token_store.clone()));
    let csrf = Arc::new(CsrfTokenCache::new(
        Arc::new(fetcher) as Arc<dyn CsrfTokenFetcher>
    ));

    let client = ApiClient::new(&options.api, transport, csrf)?
        .with_bearer_provider(Arc::new(token_store.clone()))
        .with_unauthorized_handler(Arc::new(ClearTokenOnUnauthorized::new(token_store.clone())));

    let probe = HttpSessionProbe::new(client.clone(), options.api.session_path.clone());
    let controller = ModeController::new(
        &options.initial_url,
        Arc::new(probe),
        confirmation,
        navigation,
    );

    let token_subscription = {
        let controller = controller.clone();
        token_store.subscribe(move |_| controller.invalidate_session())
    };

    Ok(AdminRuntime {
        token_store,
        client,
        controller,
        _token_subscription: token_subscription,
    })
}

fn join_endpoint(base_url: &str, path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        format!("{base_url}{trimmed}")
    } else {
        format!("{base_url}/{trimmed}")
    }
}
