//! Cliente del módulo de documentos: modelos, árbol de carpetas, proyección
//! de la vista de documentos y sincronización con el backend REST.

pub mod api;
pub mod auth;
pub mod client;
pub mod collate;
pub mod config;
pub mod error;
pub mod models;
pub mod projection;
pub mod session;
pub mod store;
pub mod tree;

pub use api::{DocumentQuery, DocumentsApi, ShareQuery};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use projection::{project, FolderSelector, SortKey, ViewParams};
pub use session::Session;
pub use store::DocumentsStore;
pub use tree::{build_tree, FolderNode};
