use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub firestore_project_id: String,
    /// Firestore database id, `(default)` unless a named database is used.
    pub firestore_database: String,
    /// Root of the Firestore REST API, without the `/v1` suffix.
    pub firestore_base_url: String,
    /// Static bearer token sent with Firestore requests. `None` against the emulator.
    pub firestore_token: Option<String>,
    pub firestore_timeout_secs: u64,
    pub firestore_max_retries: u32,
    pub firestore_retry_backoff_ms: u64,
    pub links_collection: String,
    pub products_collection: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("firestore_project_id", &self.firestore_project_id)
            .field("firestore_database", &self.firestore_database)
            .field("firestore_base_url", &self.firestore_base_url)
            .field(
                "firestore_token",
                &self.firestore_token.as_ref().map(|_| "[redacted]"),
            )
            .field("firestore_timeout_secs", &self.firestore_timeout_secs)
            .field("firestore_max_retries", &self.firestore_max_retries)
            .field(
                "firestore_retry_backoff_ms",
                &self.firestore_retry_backoff_ms,
            )
            .field("links_collection", &self.links_collection)
            .field("products_collection", &self.products_collection)
            .finish()
    }
}
