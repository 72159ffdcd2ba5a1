//! Tipos de error del cliente de documentos.

use thiserror::Error;

use crate::models::ShareStatus;

/// Error de cualquier operación contra el backend de documentos.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Fallo de transporte (conexión, timeout, cuerpo ilegible...).
    #[error("Error HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL no válida: {0}")]
    Url(#[from] url::ParseError),

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    /// El backend rechazó el token enviado (401).
    #[error("No autorizado: el servidor rechazó el token de acceso")]
    Unauthorized,

    /// El backend devolvió 403.
    #[error("Acceso denegado")]
    Forbidden,

    /// 401 sin token en la sesión: hay que pasar por la pantalla de login.
    #[error("No hay sesión iniciada; redirigir a {login_url}")]
    LoginRequired { login_url: String },

    #[error("Recurso no encontrado: {0}")]
    NotFound(String),

    #[error("Error del servidor {status}: {message}")]
    Server { status: u16, message: String },

    /// La respuesta no es ni una lista ni un envoltorio paginado.
    #[error("Formato de respuesta inesperado: {0}")]
    UnexpectedShape(String),

    #[error("Transición de estado no permitida: {from} -> {to}")]
    InvalidTransition { from: ShareStatus, to: ShareStatus },
}

impl ApiError {
    /// 401/403 o sesión ausente. Las lecturas degradan estos casos a colección vacía.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::Forbidden | ApiError::LoginRequired { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
