// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::{
    db::{InMemoryVisitStore, PgVisitStore, VisitStore},
    services::{DashboardService, DuplicationService, ReportService, UploadController, VisitService},
};

pub const REPORT_FONT_FAMILY: &str = "Roboto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

// Erros fatais de inicialização
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} deve ser definida")]
    MissingVar(&'static str),

    #[error("{var} inválida: '{value}' não é um número positivo")]
    InvalidNumber { var: &'static str, value: String },

    #[error("STORE_BACKEND desconhecido: '{0}'")]
    UnknownBackend(String),
}

impl ConfigError {
    /// O que o operador precisa fazer para a aplicação subir.
    pub fn remediation(&self) -> &'static str {
        match self {
            ConfigError::MissingVar(_) => {
                "Defina a variável no ambiente ou no arquivo .env (veja .env.example)."
            }
            ConfigError::InvalidNumber { .. } => "Use um inteiro maior que zero.",
            ConfigError::UnknownBackend(_) => "Valores aceitos: 'postgres' ou 'memory'.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub bind_addr: String,
    pub store_timeout: Duration,
    pub pending_upload_ttl: Duration,
    pub report_fonts_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Postgres,
            database_url: None,
            db_max_connections: 5,
            db_acquire_timeout: Duration::from_secs(3),
            bind_addr: "0.0.0.0:3000".to_string(),
            store_timeout: Duration::from_secs(10),
            pending_upload_ttl: Duration::from_secs(30 * 60),
            report_fonts_dir: PathBuf::from("./fonts"),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Mesma leitura de `from_env`, com a fonte das variáveis injetada (usado nos testes).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Variável vazia no .env conta como ausente
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let number = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(var) {
                None => Ok(default),
                Some(raw) => raw
                    .parse::<u64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ConfigError::InvalidNumber { var, value: raw }),
            }
        };

        let store_backend = match get("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.store_backend,
        };

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL"));
        }

        let db_max_connections = number("DB_MAX_CONNECTIONS", defaults.db_max_connections.into())?;
        let db_max_connections = u32::try_from(db_max_connections).map_err(|_| ConfigError::InvalidNumber {
            var: "DB_MAX_CONNECTIONS",
            value: db_max_connections.to_string(),
        })?;

        let max_upload_bytes = number("MAX_UPLOAD_BYTES", defaults.max_upload_bytes as u64)?;
        let max_upload_bytes = usize::try_from(max_upload_bytes).map_err(|_| ConfigError::InvalidNumber {
            var: "MAX_UPLOAD_BYTES",
            value: max_upload_bytes.to_string(),
        })?;

        Ok(Self {
            store_backend,
            database_url,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(number(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout.as_secs(),
            )?),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            store_timeout: Duration::from_secs(number("STORE_TIMEOUT_SECS", defaults.store_timeout.as_secs())?),
            pending_upload_ttl: Duration::from_secs(number(
                "PENDING_UPLOAD_TTL_SECS",
                defaults.pending_upload_ttl.as_secs(),
            )?),
            report_fonts_dir: get("REPORT_FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_fonts_dir),
            max_upload_bytes,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn VisitStore>,
    pub visit_service: VisitService,
    pub duplication_service: DuplicationService,
    pub upload_controller: UploadController,
    pub dashboard_service: DashboardService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn VisitStore> = match config.store_backend {
            StoreBackend::Memory => {
                tracing::warn!("⚠️ Usando armazenamento em memória: os dados somem ao reiniciar");
                Arc::new(InMemoryVisitStore::new())
            }
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::MissingVar("DATABASE_URL"))?;

                // Conecta ao banco de dados, usando '?' para propagar erros
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(config.db_acquire_timeout)
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!().run(&db_pool).await?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgVisitStore::new(db_pool))
            }
        };

        Ok(Self::with_store(config, store))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(config: AppConfig, store: Arc<dyn VisitStore>) -> Self {
        // TTL vem de u64 > 0 segundos; satura em vez de estourar
        let ttl = chrono::Duration::from_std(config.pending_upload_ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            visit_service: VisitService::new(store.clone()),
            duplication_service: DuplicationService::new(store.clone()),
            upload_controller: UploadController::new(store.clone(), ttl),
            dashboard_service: DashboardService::new(store.clone(), config.store_timeout),
            report_service: ReportService::new(
                store.clone(),
                config.report_fonts_dir.clone(),
                REPORT_FONT_FAMILY.to_string(),
            ),
            store,
            config: Arc::new(config),
        }
    }
}
