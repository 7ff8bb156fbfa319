use std::sync::Arc;

#[tokio::main]
async fn main() {
    disclose_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let invite_redirect_to = std::env::var("INVITE_REDIRECT_URL")
        .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string());

    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let services = if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        disclose_api::app::build_persistent_services(&database_url, invite_redirect_to)
            .await
            .expect("failed to connect to Postgres")
    } else {
        tracing::warn!("using in-memory stores; state is lost on restart");
        disclose_api::app::build_in_memory_services(invite_redirect_to)
    };

    let app = disclose_api::app::build_app(Arc::new(services), jwt_secret.as_bytes());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
