//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use visits_backend::{
    config::{AppConfig, AppState},
    routes,
};

#[tokio::main]
async fn main() {
    // .env é opcional: em produção as variáveis vêm do ambiente
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("🔥 Configuração inválida: {}. {}", e, e.remediation());
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("🔥 Falha ao inicializar o estado da aplicação: {:?}", e);
            std::process::exit(1);
        }
    };

    let addr = app_state.config.bind_addr.clone();
    let app = routes::router(app_state);

    // Inicia o servidor
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("🔥 Falha ao iniciar o listener TCP em {}: {}. Verifique BIND_ADDR.", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("🚀 Servidor escutando em {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("🔥 Erro no servidor Axum: {}", e);
        std::process::exit(1);
    }
}
