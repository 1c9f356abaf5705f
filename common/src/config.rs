use std::env;
use std::time::Duration;

use crate::history::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Configuración de conexión compartida por los binarios.
///
/// - `LAMPEK_URL`: URL base del servidor, `http://localhost:8080` si no está
/// - `LAMPEK_USER`: dueño de los procesos, añade `/user/{name}` a cada ruta
/// - `POLL_INTERVAL_MS`: periodo de polling del historial, 1000 ms si falta o es inválido
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub user: Option<String>,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("LAMPEK_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let user = lookup("LAMPEK_USER").filter(|u| !u.is_empty());
        let poll_interval = lookup("POLL_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        Self {
            base_url,
            user,
            poll_interval,
        }
    }

    /// Raíz de la que cuelgan las rutas de procesos, siempre acabada en `/`.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.user {
            Some(user) => format!("{}/user/{}/", base, user),
            None => format!("{}/", base),
        }
    }
}
