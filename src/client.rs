//! Cliente HTTP base: URL del backend, token de la sesión en cada petición y
//! traducción de códigos de estado a `ApiError`.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    login_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            login_url: config.login_url(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Añade `Authorization: Bearer` si la sesión tiene token.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let had_token = self.session.is_authenticated();
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let path = response.url().path().to_string();
        match status {
            StatusCode::UNAUTHORIZED if !had_token => {
                warn!("401 en {path} sin sesión iniciada; se requiere login");
                self.session.require_login(self.login_url.clone());
                Err(ApiError::LoginRequired {
                    login_url: self.login_url.clone(),
                })
            }
            StatusCode::UNAUTHORIZED => {
                warn!("401 en {path}: el servidor rechazó el token, se cierra la sesión");
                self.session.clear();
                Err(ApiError::Unauthorized)
            }
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(ApiError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.get(url).query(query)).await?;
        Ok(response.json().await?)
    }

    /// GET de un listado: acepta lista directa o envoltorio paginado.
    pub(crate) async fn get_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.get(url).query(query)).await?;
        let text = response.text().await?;
        parse_listing(parse_listing_body(&text)?)
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.post(url).json(body)).await?;
        Ok(response.json().await?)
    }

    /// POST de una acción sin cuerpo (archive, accept, mark_read...).
    pub(crate) async fn post_action(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    /// POST de una acción sin cuerpo cuya respuesta interesa.
    pub(crate) async fn post_action_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.post(url)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.patch(url).json(body)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.post(url).multipart(form)).await?;
        Ok(response.json().await?)
    }
}

/// Extrae los elementos de un listado. El backend responde con una lista
/// directa o con `{ "count": .., "results": [..] }` según la paginación.
pub(crate) fn parse_listing<T: DeserializeOwned>(body: Value) -> Result<Vec<T>> {
    match body {
        Value::Array(_) => {
            debug!("Listado recibido como lista directa");
            Ok(serde_json::from_value(body)?)
        }
        Value::Object(mut map) => match map.remove("results") {
            Some(results @ Value::Array(_)) => {
                debug!("Listado recibido paginado");
                Ok(serde_json::from_value(results)?)
            }
            _ => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                Err(ApiError::UnexpectedShape(format!(
                    "objeto sin `results` (claves: {})",
                    keys.join(", ")
                )))
            }
        },
        other => Err(ApiError::UnexpectedShape(shape_name(&other).to_string())),
    }
}

/// Un 200 cuyo cuerpo no es JSON (página de login, error de un proxy) es
/// una forma inesperada, no un fallo de transporte.
fn parse_listing_body(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|err| {
        let preview: String = text.chars().take(40).collect();
        ApiError::UnexpectedShape(format!("cuerpo no JSON ({err}): {preview}"))
    })
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "booleano",
        Value::Number(_) => "número",
        Value::String(_) => "cadena",
        Value::Array(_) => "lista",
        Value::Object(_) => "objeto",
    }
}
