use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::get, Router};
use tower::ServiceBuilder;

use disclose_access::{
    AccessEngine, IdentityProvider, InMemoryDirectory, InMemoryMembershipStore,
    MemberProvisioning, MembershipStore,
};
use disclose_infra::{PostgresDirectory, PostgresMembershipStore};

use crate::middleware::{AuthState, TokenVerifier};

pub mod dto;
pub mod errors;
pub mod routes;

type DynStore = Arc<dyn MembershipStore>;
type DynDirectory = Arc<dyn IdentityProvider>;

/// Engine + provisioning wired over injected store/directory handles.
pub struct AppServices {
    engine: AccessEngine<DynStore>,
    provisioning: MemberProvisioning<DynStore, DynDirectory>,
}

impl AppServices {
    pub fn new(store: DynStore, directory: DynDirectory, invite_redirect_to: String) -> Self {
        let engine = AccessEngine::new(store.clone());
        let provisioning =
            MemberProvisioning::new(AccessEngine::new(store), directory, invite_redirect_to);
        Self {
            engine,
            provisioning,
        }
    }

    pub fn engine(&self) -> &AccessEngine<DynStore> {
        &self.engine
    }

    pub fn provisioning(&self) -> &MemberProvisioning<DynStore, DynDirectory> {
        &self.provisioning
    }
}

/// In-memory wiring (dev/test): store + directory with no persistence.
pub fn build_in_memory_services(invite_redirect_to: String) -> AppServices {
    let store: DynStore = Arc::new(InMemoryMembershipStore::new());
    let directory: DynDirectory = Arc::new(InMemoryDirectory::new());
    AppServices::new(store, directory, invite_redirect_to)
}

/// Postgres wiring: store and directory share the pool.
pub async fn build_persistent_services(
    database_url: &str,
    invite_redirect_to: String,
) -> anyhow::Result<AppServices> {
    let pool = sqlx::PgPool::connect(database_url).await?;
    let store: DynStore = Arc::new(PostgresMembershipStore::new(pool.clone()));
    let directory: DynDirectory = Arc::new(PostgresDirectory::new(pool));
    Ok(AppServices::new(store, directory, invite_redirect_to))
}

/// Assemble the router: public health probe plus attested company routes.
pub fn build_app(services: Arc<AppServices>, jwt_secret: &[u8]) -> Router {
    let auth_state = AuthState {
        verifier: Arc::new(TokenVerifier::new(jwt_secret)),
    };

    let protected = Router::new()
        .merge(routes::members::router())
        .merge(routes::topics::router())
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            crate::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

async fn health() -> StatusCode {
    StatusCode::OK
}
