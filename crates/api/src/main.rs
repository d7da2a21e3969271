#[tokio::main]
async fn main() {
    aegis_observability::init();

    let config = aegis_api::config::AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();

    let app = aegis_api::app::build_app(config).expect("failed to build application");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
