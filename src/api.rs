//! Endpoints REST del módulo de documentos: carpetas, ficheros, comparticiones y notificaciones.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::{
    client::ApiClient,
    error::Result,
    models::{
        Document, DocumentShare, DocumentUpdate, Folder, NewFolder, NewShare, SearchParams,
        ShareDirection, ShareNotification, ShareStatus, UploadForm,
    },
    projection::SortKey,
    tree::FolderNode,
};

const API_BASE: &str = "api/v1";

// --- Respuestas de acciones ---

#[derive(Deserialize)]
struct ToggleExpandResponse {
    is_expanded: bool,
}

#[derive(Deserialize)]
struct DownloadUrlResponse {
    download_url: String,
}

#[derive(Deserialize)]
struct MarkAllReadResponse {
    marked_read: u64,
}

#[derive(Deserialize)]
struct UnreadCountResponse {
    unread_count: u64,
}

// --- Filtros de listados ---

/// Filtros de `GET files/`. Los campos a `None` no se envían.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub folder: Option<String>,
    pub archived: Option<bool>,
    pub sort: Option<SortKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareQuery {
    pub direction: Option<ShareDirection>,
    pub status: Option<ShareStatus>,
}

fn path(resource: &str) -> String {
    format!("{API_BASE}/{resource}/")
}

fn item_path(resource: &str, id: &str) -> String {
    format!("{API_BASE}/{resource}/{}/", urlencoding::encode(id))
}

fn action_path(resource: &str, id: &str, action: &str) -> String {
    format!("{API_BASE}/{resource}/{}/{action}/", urlencoding::encode(id))
}

/// Endpoints REST del módulo de documentos.
#[derive(Debug, Clone)]
pub struct DocumentsApi {
    client: ApiClient,
}

impl DocumentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // --- Carpetas ---

    pub async fn list_folders(&self, parent: Option<&str>) -> Result<Vec<Folder>> {
        let mut query = Vec::new();
        if let Some(parent) = parent {
            query.push(("parent", parent.to_string()));
        }
        self.client.get_listing(&path("folders"), &query).await
    }

    pub async fn create_folder(&self, folder: &NewFolder) -> Result<Folder> {
        self.client.post_json(&path("folders"), folder).await
    }

    /// Devuelve el nuevo estado de despliegue.
    pub async fn toggle_folder_expand(&self, folder_id: &str) -> Result<bool> {
        let response: ToggleExpandResponse = self
            .client
            .post_action_json(&action_path("folders", folder_id, "toggle_expand"))
            .await?;
        Ok(response.is_expanded)
    }

    /// Árbol ya anidado por el servidor.
    pub async fn folder_tree(&self) -> Result<Vec<FolderNode>> {
        self.client
            .get_listing(&format!("{API_BASE}/folders/tree/"), &[])
            .await
    }

    // --- Documentos ---

    pub async fn list_documents(&self, filter: &DocumentQuery) -> Result<Vec<Document>> {
        let mut query = Vec::new();
        if let Some(folder) = &filter.folder {
            query.push(("folder", folder.clone()));
        }
        if let Some(archived) = filter.archived {
            query.push(("archived", archived.to_string()));
        }
        if let Some(sort) = filter.sort {
            query.push(("sort", sort.as_str().to_string()));
        }
        self.client.get_listing(&path("files"), &query).await
    }

    /// Subida multipart: `file`, `folder`, `nickname`, `description` y un
    /// `share_with` por cada destinatario.
    pub async fn upload_document(&self, upload: UploadForm) -> Result<Document> {
        let mime = upload.file.mime_type();
        debug!(
            "Subiendo {} ({} bytes, {mime})",
            upload.file.file_name,
            upload.file.bytes.len()
        );

        let part = Part::bytes(upload.file.bytes)
            .file_name(upload.file.file_name)
            .mime_str(mime.as_ref())?;
        let mut form = Form::new().part("file", part);
        if let Some(folder) = upload.folder.filter(|f| !f.is_empty()) {
            form = form.text("folder", folder);
        }
        if !upload.nickname.is_empty() {
            form = form.text("nickname", upload.nickname);
        }
        if !upload.description.is_empty() {
            form = form.text("description", upload.description);
        }
        for user_id in upload.share_with {
            form = form.text("share_with", user_id);
        }

        self.client
            .post_multipart(&format!("{API_BASE}/files/upload/"), form)
            .await
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Document> {
        self.client
            .get_json(&item_path("files", document_id), &[])
            .await
    }

    pub async fn update_document(
        &self,
        document_id: &str,
        update: &DocumentUpdate,
    ) -> Result<Document> {
        self.client
            .patch_json(&item_path("files", document_id), update)
            .await
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.client.delete(&item_path("files", document_id)).await
    }

    pub async fn archive_document(&self, document_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("files", document_id, "archive"))
            .await
    }

    pub async fn restore_document(&self, document_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("files", document_id, "restore"))
            .await
    }

    pub async fn download_url(&self, document_id: &str) -> Result<String> {
        let response: DownloadUrlResponse = self
            .client
            .get_json(&action_path("files", document_id, "download_url"), &[])
            .await?;
        Ok(response.download_url)
    }

    pub async fn search_documents(&self, params: &SearchParams) -> Result<Vec<Document>> {
        let body: serde_json::Value = self
            .client
            .post_json(&format!("{API_BASE}/files/search/"), params)
            .await?;
        crate::client::parse_listing(body)
    }

    // --- Comparticiones ---

    pub async fn list_shares(&self, filter: &ShareQuery) -> Result<Vec<DocumentShare>> {
        let mut query = Vec::new();
        if let Some(direction) = filter.direction {
            query.push(("type", direction.as_str().to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        self.client.get_listing(&path("shares"), &query).await
    }

    pub async fn create_share(&self, share: &NewShare) -> Result<DocumentShare> {
        self.client.post_json(&path("shares"), share).await
    }

    pub async fn accept_share(&self, share_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("shares", share_id, "accept"))
            .await
    }

    pub async fn reject_share(&self, share_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("shares", share_id, "reject"))
            .await
    }

    pub async fn revoke_share(&self, share_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("shares", share_id, "revoke"))
            .await
    }

    // --- Notificaciones ---

    pub async fn list_notifications(&self, is_read: Option<bool>) -> Result<Vec<ShareNotification>> {
        let mut query = Vec::new();
        if let Some(is_read) = is_read {
            query.push(("is_read", is_read.to_string()));
        }
        self.client.get_listing(&path("notifications"), &query).await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.client
            .post_action(&action_path("notifications", notification_id, "mark_read"))
            .await
    }

    /// Devuelve cuántas notificaciones marcó el servidor.
    pub async fn mark_all_notifications_read(&self) -> Result<u64> {
        let response: MarkAllReadResponse = self
            .client
            .post_action_json(&format!("{API_BASE}/notifications/mark_all_read/"))
            .await?;
        Ok(response.marked_read)
    }

    pub async fn unread_count(&self) -> Result<u64> {
        let response: UnreadCountResponse = self
            .client
            .get_json(&format!("{API_BASE}/notifications/unread_count/"), &[])
            .await?;
        Ok(response.unread_count)
    }
}
