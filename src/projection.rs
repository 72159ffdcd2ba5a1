//! Vista filtrada y ordenada de los documentos de la carpeta actual.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collate::CollationKey;
use crate::models::Document;

/// Carpeta seleccionada en la vista.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FolderSelector {
    #[default]
    Root,
    Folder(String),
}

impl FolderSelector {
    pub fn folder_id(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Folder(id) => Some(id),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.folder_id() == self.folder_id()
    }
}

/// `None` o una cadena vacía seleccionan la raíz.
impl From<Option<String>> for FolderSelector {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(id) if !id.is_empty() => Self::Folder(id),
            _ => Self::Root,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Date,
    Size,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::Size => "size",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            "size" => Ok(Self::Size),
            other => Err(format!("Criterio de orden no soportado: {other}")),
        }
    }
}

/// Parámetros de la vista de documentos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ViewParams {
    pub folder: FolderSelector,
    pub show_archived: bool,
    pub sort: SortKey,
}

/// Proyección pura: documentos de la carpeta seleccionada cuyo estado de
/// archivo coincide exactamente con `show_archived`, ordenados según `sort`.
///
/// - `Date`: más recientes primero.
/// - `Size`: más grandes primero.
/// - `Name`: nombre visible ascendente con colación del locale.
///
/// Los empates se resuelven por id ascendente, así que la salida no depende
/// del orden de entrada.
pub fn project<'a>(documents: &'a [Document], params: &ViewParams) -> Vec<&'a Document> {
    let mut visible: Vec<&Document> = documents
        .iter()
        .filter(|doc| params.folder.matches(doc))
        .filter(|doc| doc.is_archived == params.show_archived)
        .collect();

    match params.sort {
        SortKey::Date => visible.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Size => visible.sort_by(|a, b| {
            b.file_size
                .cmp(&a.file_size)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Name => {
            visible.sort_by_cached_key(|doc| (CollationKey::new(doc.display_name()), doc.id.clone()))
        }
    }

    visible
}
