//! Carga y gestión de configuración del cliente (backend + sesión).

use std::env;

use anyhow::{anyhow, Context, Result};
use url::Url;

/// Configuración completa del cliente.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// URL base del backend, siempre terminada en `/`.
    pub api_url: Url,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Ruta de la pantalla de login, relativa a `api_url`.
    pub login_path: String,
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Configuración mínima contra `api_url`, sin credenciales.
    pub fn new(mut api_url: Url) -> Self {
        ensure_trailing_slash(&mut api_url);
        Self {
            api_url,
            access_token: None,
            refresh_token: None,
            email: None,
            password: None,
            login_path: "/login".to_string(),
            timeout_secs: 30,
        }
    }

    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let api_url_str =
            env::var("DOCS_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let api_url = normalize_base_url(&api_url_str)?;

        let timeout_secs = match env::var("DOCS_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DOCS_HTTP_TIMEOUT_SECS no es un número: {raw}"))?,
            Err(_) => 30,
        };

        let login_path = env::var("DOCS_LOGIN_PATH").unwrap_or_else(|_| "/login".to_string());

        Ok(Self {
            api_url,
            access_token: non_empty_var("DOCS_ACCESS_TOKEN"),
            refresh_token: non_empty_var("DOCS_REFRESH_TOKEN"),
            email: non_empty_var("DOCS_EMAIL"),
            password: non_empty_var("DOCS_PASSWORD"),
            login_path,
            timeout_secs,
        })
    }

    /// URL absoluta de la pantalla de login.
    pub fn login_url(&self) -> String {
        self.api_url
            .join(&self.login_path)
            .map(String::from)
            .unwrap_or_else(|_| self.login_path.clone())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Valida la URL base y le añade la barra final para que `Url::join`
/// conserve el prefijo de ruta ("http://host/app" + "api/v1/").
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| anyhow!("URL del backend no válida ({raw}): {e}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("La URL del backend no puede usarse como base: {raw}"));
    }
    ensure_trailing_slash(&mut url);
    Ok(url)
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
}
