//! Sesión de usuario compartida entre el cliente HTTP y quien lo usa.
//!
//! Sustituye al token guardado en el almacenamiento del navegador: se fija al
//! iniciar sesión (o desde la configuración), se borra al cerrar sesión o
//! cuando el backend rechaza el token, y se lee en cada petición saliente.

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::User;

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    login_redirect: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(access_token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_tokens(access_token, None);
        session
    }

    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: Option<String>) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.access_token = Some(access_token.into());
        state.refresh_token = refresh_token;
        state.login_redirect = None;
    }

    pub fn set_user(&self, user: User) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user = Some(user);
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .is_some()
    }

    /// Olvida tokens y usuario. No toca una redirección pendiente.
    pub fn clear(&self) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.access_token = None;
        state.refresh_token = None;
        state.user = None;
    }

    /// Anota que hay que llevar al usuario a la pantalla de login.
    pub fn require_login(&self, login_url: impl Into<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .login_redirect = Some(login_url.into());
    }

    /// Devuelve y consume la redirección pendiente, si la hay.
    pub fn take_login_redirect(&self) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .login_redirect
            .take()
    }
}
