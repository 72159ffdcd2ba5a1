//! Estado del módulo de documentos: colecciones planas, parámetros de vista
//! y acciones de sincronización con el backend.
//!
//! Cada acción hace un único viaje al servidor y, si sale bien, parchea la
//! colección local (añadir, quitar o modificar por id) para que las vistas
//! calculadas no necesiten recargar todo. Si falla, el estado local queda
//! como estaba y el error se devuelve al llamador.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    api::{DocumentQuery, DocumentsApi, ShareQuery},
    error::{ApiError, Result},
    models::{
        Document, DocumentShare, DocumentUpdate, Folder, NewFolder, NewShare, SearchParams,
        SharePermissions, ShareNotification, ShareStatus, UploadForm,
    },
    projection::{self, FolderSelector, SortKey, ViewParams},
    tree::{self, FolderNode},
};

/// Aplica el resultado de un listado a su colección local.
///
/// - Éxito: se reemplaza la colección.
/// - 401/403 o sesión ausente: se vacía y no es un error para el llamador.
/// - Formato inesperado: se vacía y se registra.
/// - Cualquier otro fallo: la colección no cambia y el error sube.
fn settle_listing<T>(target: &mut Vec<T>, what: &str, result: Result<Vec<T>>) -> Result<()> {
    match result {
        Ok(items) => {
            debug!("{what}: {} elementos recibidos", items.len());
            *target = items;
            Ok(())
        }
        Err(err) if err.is_auth_failure() => {
            warn!("{what}: sin autorización ({err}); se vacía la colección");
            target.clear();
            Ok(())
        }
        Err(ApiError::UnexpectedShape(shape)) => {
            error!("{what}: formato de respuesta inesperado ({shape}); se vacía la colección");
            target.clear();
            Ok(())
        }
        Err(err) => {
            error!("{what}: error al cargar: {err}");
            Err(err)
        }
    }
}

pub struct DocumentsStore {
    api: DocumentsApi,
    documents: Vec<Document>,
    folders: Vec<Folder>,
    shares: Vec<DocumentShare>,
    notifications: Vec<ShareNotification>,
    view: ViewParams,
    loading: bool,
    search_query: String,
    selected_documents: Vec<String>,
}

impl DocumentsStore {
    pub fn new(api: DocumentsApi) -> Self {
        Self {
            api,
            documents: Vec::new(),
            folders: Vec::new(),
            shares: Vec::new(),
            notifications: Vec::new(),
            view: ViewParams::default(),
            loading: false,
            search_query: String::new(),
            selected_documents: Vec::new(),
        }
    }

    pub fn api(&self) -> &DocumentsApi {
        &self.api
    }

    // ---------------------------------------------------------------------
    // ESTADO
    // ---------------------------------------------------------------------

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn shares(&self) -> &[DocumentShare] {
        &self.shares
    }

    pub fn notifications(&self) -> &[ShareNotification] {
        &self.notifications
    }

    pub fn view(&self) -> &ViewParams {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.view.folder.folder_id()
    }

    pub fn set_current_folder(&mut self, folder: Option<String>) {
        self.view.folder = FolderSelector::from(folder);
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.view.sort = sort;
    }

    pub fn set_show_archived(&mut self, show_archived: bool) {
        self.view.show_archived = show_archived;
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn selected_documents(&self) -> &[String] {
        &self.selected_documents
    }

    /// Alterna la selección de un documento; devuelve si queda seleccionado.
    pub fn toggle_selection(&mut self, document_id: &str) -> bool {
        if let Some(pos) = self.selected_documents.iter().position(|id| id == document_id) {
            self.selected_documents.remove(pos);
            false
        } else {
            self.selected_documents.push(document_id.to_string());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_documents.clear();
    }

    // ---------------------------------------------------------------------
    // VISTAS CALCULADAS
    // ---------------------------------------------------------------------

    /// Documentos de la carpeta actual, filtrados por archivo y ordenados.
    pub fn sorted_documents(&self) -> Vec<&Document> {
        projection::project(&self.documents, &self.view)
    }

    /// Ruta de la carpeta actual, o "/" en la raíz o si no se conoce.
    pub fn current_folder_path(&self) -> String {
        let Some(folder_id) = self.current_folder() else {
            return "/".to_string();
        };
        match self.folders.iter().find(|f| f.id == folder_id) {
            Some(folder) if !folder.full_path.is_empty() => folder.full_path.clone(),
            Some(_) => tree::full_path(&self.folders, folder_id).unwrap_or_else(|| "/".to_string()),
            None => "/".to_string(),
        }
    }

    pub fn unread_notification_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn folder_tree(&self) -> Vec<FolderNode> {
        tree::build_tree(&self.folders)
    }

    // ---------------------------------------------------------------------
    // LECTURAS
    // ---------------------------------------------------------------------

    fn current_query(&self) -> DocumentQuery {
        DocumentQuery {
            folder: self.current_folder().map(str::to_string),
            archived: Some(self.view.show_archived),
            sort: Some(self.view.sort),
        }
    }

    /// Documentos de la carpeta actual.
    pub async fn fetch_documents(&mut self) -> Result<()> {
        let query = self.current_query();
        self.load_documents(query, "documentos").await
    }

    /// Documentos de todas las carpetas (la proyección filtra después).
    pub async fn fetch_all_documents(&mut self) -> Result<()> {
        let query = DocumentQuery {
            folder: None,
            ..self.current_query()
        };
        self.load_documents(query, "todos los documentos").await
    }

    async fn load_documents(&mut self, query: DocumentQuery, what: &str) -> Result<()> {
        info!("Cargando {what}...");
        self.loading = true;
        let result = self.api.list_documents(&query).await;
        self.loading = false;
        settle_listing(&mut self.documents, what, result)
    }

    pub async fn fetch_folders(&mut self) -> Result<()> {
        info!("Cargando carpetas...");
        self.loading = true;
        let result = self.api.list_folders(None).await;
        self.loading = false;
        settle_listing(&mut self.folders, "carpetas", result)?;
        self.report_orphans();
        Ok(())
    }

    fn report_orphans(&self) {
        let orphans = tree::unreachable_folders(&self.folders);
        if !orphans.is_empty() {
            let ids: Vec<&str> = orphans.iter().map(|f| f.id.as_str()).collect();
            warn!(
                "{} carpetas no cuelgan de ninguna raíz y no se mostrarán: {}",
                ids.len(),
                ids.join(", ")
            );
        }
    }

    pub async fn fetch_shares(&mut self, query: ShareQuery) -> Result<()> {
        self.loading = true;
        let result = self.api.list_shares(&query).await;
        self.loading = false;
        settle_listing(&mut self.shares, "comparticiones", result)
    }

    /// Notificaciones no leídas.
    pub async fn fetch_notifications(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.api.list_notifications(Some(false)).await;
        self.loading = false;
        settle_listing(&mut self.notifications, "notificaciones", result)
    }

    /// Carpetas, documentos de la vista actual y notificaciones en paralelo.
    /// Se aplican los tres resultados y se devuelve el primer error, si lo hay.
    pub async fn refresh(&mut self) -> Result<()> {
        let query = self.current_query();
        self.loading = true;
        let (folders, documents, notifications) = futures::join!(
            self.api.list_folders(None),
            self.api.list_documents(&query),
            self.api.list_notifications(Some(false)),
        );
        self.loading = false;

        let folders = settle_listing(&mut self.folders, "carpetas", folders);
        self.report_orphans();
        let documents = settle_listing(&mut self.documents, "documentos", documents);
        let notifications =
            settle_listing(&mut self.notifications, "notificaciones", notifications);
        folders.and(documents).and(notifications)
    }

    /// Búsqueda en el servidor. No modifica la colección de documentos.
    pub async fn search_documents(&mut self, params: &SearchParams) -> Result<Vec<Document>> {
        self.loading = true;
        let result = self.api.search_documents(params).await;
        self.loading = false;
        result
    }

    pub async fn download_url(&self, document_id: &str) -> Result<String> {
        self.api.download_url(document_id).await
    }

    pub async fn fetch_unread_count(&self) -> Result<u64> {
        self.api.unread_count().await
    }

    /// Árbol tal y como lo anida el servidor (sin tocar las carpetas locales).
    pub async fn fetch_server_tree(&self) -> Result<Vec<FolderNode>> {
        self.api.folder_tree().await
    }

    // ---------------------------------------------------------------------
    // ESCRITURAS
    // ---------------------------------------------------------------------

    pub async fn upload_document(&mut self, upload: UploadForm) -> Result<&Document> {
        let file_name = upload.file.file_name.clone();
        debug!("Subiendo documento {file_name} ({})", upload.file.file_type());
        match self.api.upload_document(upload).await {
            Ok(document) => {
                info!("Documento subido: {} ({})", document.display_name(), document.id);
                self.documents.push(document);
                Ok(&self.documents[self.documents.len() - 1])
            }
            Err(err) => {
                error!("Error subiendo {file_name}: {err}");
                Err(err)
            }
        }
    }

    pub async fn create_folder(&mut self, name: &str, parent: Option<String>) -> Result<&Folder> {
        let request = NewFolder {
            name: name.to_string(),
            parent,
        };
        match self.api.create_folder(&request).await {
            Ok(folder) => {
                info!("Carpeta creada: {} ({})", folder.name, folder.id);
                self.folders.push(folder);
                Ok(&self.folders[self.folders.len() - 1])
            }
            Err(err) => {
                error!("Error creando la carpeta {name}: {err}");
                Err(err)
            }
        }
    }

    /// Solo actúa sobre carpetas conocidas localmente; devuelve el nuevo estado.
    pub async fn toggle_folder_expanded(&mut self, folder_id: &str) -> Result<Option<bool>> {
        let Some(index) = self.folders.iter().position(|f| f.id == folder_id) else {
            debug!("Carpeta {folder_id} no cargada; no se despliega");
            return Ok(None);
        };
        let expanded = self.api.toggle_folder_expand(folder_id).await?;
        self.folders[index].is_expanded = expanded;
        Ok(Some(expanded))
    }

    /// PATCH parcial; el registro local se sustituye por el del servidor.
    pub async fn update_document(
        &mut self,
        document_id: &str,
        update: &DocumentUpdate,
    ) -> Result<Document> {
        let updated = self.api.update_document(document_id, update).await?;
        match self.documents.iter_mut().find(|d| d.id == document_id) {
            Some(local) => *local = updated.clone(),
            None => self.documents.push(updated.clone()),
        }
        Ok(updated)
    }

    pub async fn archive_document(&mut self, document_id: &str) -> Result<()> {
        self.api.archive_document(document_id).await?;
        if let Some(doc) = self.documents.iter_mut().find(|d| d.id == document_id) {
            doc.archive(Utc::now());
        }
        info!("Documento archivado: {document_id}");
        Ok(())
    }

    pub async fn restore_document(&mut self, document_id: &str) -> Result<()> {
        self.api.restore_document(document_id).await?;
        if let Some(doc) = self.documents.iter_mut().find(|d| d.id == document_id) {
            doc.restore();
        }
        info!("Documento restaurado: {document_id}");
        Ok(())
    }

    pub async fn delete_document(&mut self, document_id: &str) -> Result<()> {
        self.api.delete_document(document_id).await?;
        if let Some(index) = self.documents.iter().position(|d| d.id == document_id) {
            self.documents.remove(index);
        }
        self.selected_documents.retain(|id| id != document_id);
        info!("Documento eliminado: {document_id}");
        Ok(())
    }

    pub async fn share_document(
        &mut self,
        document_id: &str,
        recipients: Vec<String>,
        permissions: SharePermissions,
        message: impl Into<String>,
    ) -> Result<&DocumentShare> {
        let request = NewShare {
            document: document_id.to_string(),
            shared_with: recipients,
            permissions,
            message: message.into(),
        };
        let share = self.api.create_share(&request).await?;
        info!(
            "Documento {document_id} compartido con {} destinatarios",
            request.shared_with.len()
        );
        self.shares.push(share);
        Ok(&self.shares[self.shares.len() - 1])
    }

    pub async fn accept_share(&mut self, share_id: &str) -> Result<()> {
        self.answer_share(share_id, ShareStatus::Accepted).await
    }

    pub async fn reject_share(&mut self, share_id: &str) -> Result<()> {
        self.answer_share(share_id, ShareStatus::Rejected).await
    }

    pub async fn revoke_share(&mut self, share_id: &str) -> Result<()> {
        self.answer_share(share_id, ShareStatus::Revoked).await
    }

    /// Si la compartición está cargada y la transición no es válida, no se
    /// llega a llamar al servidor.
    async fn answer_share(&mut self, share_id: &str, next: ShareStatus) -> Result<()> {
        if let Some(share) = self.shares.iter().find(|s| s.id == share_id) {
            if !share.status.can_transition_to(next) {
                return Err(ApiError::InvalidTransition {
                    from: share.status,
                    to: next,
                });
            }
        }

        match next {
            ShareStatus::Accepted => self.api.accept_share(share_id).await?,
            ShareStatus::Rejected => self.api.reject_share(share_id).await?,
            ShareStatus::Revoked => self.api.revoke_share(share_id).await?,
            ShareStatus::Pending => {
                return Err(ApiError::InvalidTransition {
                    from: ShareStatus::Pending,
                    to: ShareStatus::Pending,
                })
            }
        }

        if let Some(share) = self.shares.iter_mut().find(|s| s.id == share_id) {
            share.transition(next, Utc::now())?;
        }
        info!("Compartición {share_id}: {next}");
        Ok(())
    }

    pub async fn mark_notification_read(&mut self, notification_id: &str) -> Result<()> {
        self.api.mark_notification_read(notification_id).await?;
        if let Some(n) = self.notifications.iter_mut().find(|n| n.id == notification_id) {
            n.mark_read(Utc::now());
        }
        Ok(())
    }

    /// Devuelve cuántas marcó el servidor; localmente quedan todas leídas.
    pub async fn mark_all_notifications_read(&mut self) -> Result<u64> {
        let marked = self.api.mark_all_notifications_read().await?;
        let now = Utc::now();
        for n in &mut self.notifications {
            n.mark_read(now);
        }
        info!("{marked} notificaciones marcadas como leídas");
        Ok(marked)
    }
}
