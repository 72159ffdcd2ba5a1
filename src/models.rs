//! Modelos de dominio del módulo de documentos (carpetas, ficheros,
//! comparticiones y notificaciones), tal y como los serializa el backend.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ApiError, Result};

/// Carpeta tal y como llega en la lista plana del backend.
/// La lista de hijos no forma parte del registro: la calcula `tree::build_tree`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub document_count: u64,
    /// Ruta desde la raíz ("Contratos/2024"). Derivada.
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub is_expanded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Carpeta padre; una cadena vacía cuenta como raíz.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}

/// Clasificación cerrada de tipos de fichero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Word,
    Excel,
    Pdf,
    Image,
    Csv,
    Text,
    #[default]
    #[serde(other)]
    Generic,
}

impl FileType {
    /// Deduce el tipo a partir de la extensión y el tipo MIME.
    /// El orden de las reglas importa: "text/csv" es csv, no texto.
    pub fn classify(extension: &str, mime_type: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_lowercase();
        let mime = mime_type.to_lowercase();

        if matches!(ext.as_str(), "doc" | "docx") || mime.contains("word") {
            Self::Word
        } else if matches!(ext.as_str(), "xls" | "xlsx")
            || mime.contains("excel")
            || mime.contains("spreadsheet")
        {
            Self::Excel
        } else if ext == "pdf" || mime.contains("pdf") {
            Self::Pdf
        } else if matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg")
            || mime.contains("image")
        {
            Self::Image
        } else if ext == "csv" || mime.contains("csv") {
            Self::Csv
        } else if matches!(ext.as_str(), "txt" | "md") || mime.contains("text") {
            Self::Text
        } else {
            Self::Generic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Excel => "excel",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Csv => "csv",
            Self::Text => "text",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Documento (metadatos del fichero almacenado en el backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    /// `None` = documento en la raíz.
    #[serde(default)]
    pub folder: Option<String>,
    pub original_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_type: FileType,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub uploaded_by_name: String,
    #[serde(default)]
    pub shares: Vec<DocumentShare>,
    #[serde(default)]
    pub can_share: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ai_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Apodo si lo hay; si no, el nombre original del fichero.
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.original_name
        } else {
            &self.nickname
        }
    }

    /// Carpeta propietaria; una cadena vacía cuenta como raíz.
    pub fn folder_id(&self) -> Option<&str> {
        self.folder.as_deref().filter(|id| !id.is_empty())
    }

    pub fn archive(&mut self, at: DateTime<Utc>) {
        self.is_archived = true;
        self.archived_at = Some(at);
    }

    pub fn restore(&mut self) {
        self.is_archived = false;
        self.archived_at = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Rejected,
    Revoked,
}

impl ShareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Revoked => "revoked",
        }
    }

    /// Rechazada y revocada no admiten más cambios.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Revoked)
    }

    /// pending -> accepted | rejected | revoked; accepted -> revoked.
    pub fn can_transition_to(self, next: ShareStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted | Self::Rejected | Self::Revoked)
                | (Self::Accepted, Self::Revoked)
        )
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShareStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "revoked" => Ok(Self::Revoked),
            other => Err(format!("Estado de compartición desconocido: {other}")),
        }
    }
}

/// Permisos concedidos al destinatario de una compartición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SharePermissions {
    pub can_download: bool,
    pub can_share: bool,
    pub can_edit: bool,
}

impl Default for SharePermissions {
    fn default() -> Self {
        Self {
            can_download: true,
            can_share: false,
            can_edit: false,
        }
    }
}

/// Relación de compartición de un documento entre dos usuarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentShare {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub document_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub shared_by: String,
    #[serde(default)]
    pub shared_by_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub shared_with: String,
    #[serde(default)]
    pub shared_with_name: String,
    pub status: ShareStatus,
    #[serde(default = "default_true")]
    pub can_download: bool,
    #[serde(default)]
    pub can_share: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub message: String,
    pub shared_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DocumentShare {
    pub fn permissions(&self) -> SharePermissions {
        SharePermissions {
            can_download: self.can_download,
            can_share: self.can_share,
            can_edit: self.can_edit,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }

    /// Aplica un cambio de estado validando la transición.
    /// Aceptar o rechazar fija `responded_at`; revocar no lo toca.
    pub fn transition(&mut self, next: ShareStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ApiError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if matches!(next, ShareStatus::Accepted | ShareStatus::Rejected) {
            self.responded_at = Some(at);
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShareReceived,
    ShareAccepted,
    ShareRejected,
    ShareRevoked,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShareReceived => "share_received",
            Self::ShareAccepted => "share_accepted",
            Self::ShareRejected => "share_rejected",
            Self::ShareRevoked => "share_revoked",
        }
    }
}

/// Aviso asociado a una compartición.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareNotification {
    pub id: String,
    pub document_share: String,
    #[serde(default)]
    pub document_name: String,
    #[serde(default)]
    pub shared_by_name: String,
    pub notification_type: NotificationKind,
    #[serde(default)]
    pub share_status: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShareNotification {
    /// Marcar dos veces conserva la fecha de la primera lectura.
    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "full_name")]
    pub full_name: String,
}

// --- Payloads de escritura ---

/// Fichero a subir: nombre y contenido ya leído en memoria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default()
    }

    pub fn mime_type(&self) -> mime_guess::Mime {
        mime_guess::from_path(&self.file_name).first_or_octet_stream()
    }

    pub fn file_type(&self) -> FileType {
        FileType::classify(self.extension(), self.mime_type().as_ref())
    }
}

/// Formulario multipart de subida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub file: UploadFile,
    pub folder: Option<String>,
    pub nickname: String,
    pub description: String,
    /// Destinatarios de una compartición creada junto con la subida.
    pub share_with: Vec<String>,
}

impl UploadForm {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            folder: None,
            nickname: String::new(),
            description: String::new(),
            share_with: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub parent: Option<String>,
}

/// Modificación parcial de un documento (PATCH).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `Some(None)` mueve el documento a la raíz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewShare {
    pub document: String,
    pub shared_with: Vec<String>,
    #[serde(flatten)]
    pub permissions: SharePermissions,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    pub include_description: bool,
    pub folder: Option<String>,
    pub file_types: Vec<FileType>,
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareDirection {
    Sent,
    Received,
}

impl ShareDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
        }
    }
}

impl std::str::FromStr for ShareDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sent" | "enviadas" => Ok(Self::Sent),
            "received" | "recibidas" => Ok(Self::Received),
            other => Err(format!("Dirección desconocida: {other} (sent | received)")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Los identificadores de usuario llegan como número o como cadena según el endpoint.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
