//! Inicio y cierre de sesión contra el endpoint de tokens del backend.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{client::ApiClient, error::Result, models::User};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// El backend espera el email en el campo `username`.
#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: LoginUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl From<&LoginUser> for User {
    fn from(user: &LoginUser) -> Self {
        User {
            id: user.id.to_string(),
            username: user.email.clone(),
            email: user.email.clone(),
            full_name: format!("{} {}", user.first_name, user.last_name)
                .trim()
                .to_string(),
        }
    }
}

/// Obtiene tokens y los guarda en la sesión del cliente.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<LoginResponse> {
    let request = TokenRequest {
        username: &credentials.email,
        password: &credentials.password,
    };
    let response: LoginResponse = client.post_json("api/token/", &request).await?;

    let session = client.session();
    session.set_tokens(response.access.clone(), Some(response.refresh.clone()));
    session.set_user(User::from(&response.user));
    info!("Sesión iniciada como {}", response.user.email);
    Ok(response)
}

/// Borra la sesión y deja anotada la redirección a la pantalla de login.
pub fn logout(client: &ApiClient) {
    client.session().clear();
    client.session().require_login(client.login_url());
    info!("Sesión cerrada");
}

/// Usuario autenticado según el backend; queda guardado en la sesión.
pub async fn current_user(client: &ApiClient) -> Result<User> {
    let user: User = client.get_json("api/v1/users/me/", &[]).await?;
    client.session().set_user(user.clone());
    Ok(user)
}
