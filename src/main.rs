//! docs_client: cliente de línea de comandos del módulo de documentos.

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docs_client::{
    api::ShareQuery,
    auth::{self, Credentials},
    config::{normalize_base_url, ClientConfig},
    models::{
        Document, DocumentUpdate, SharePermissions, ShareDirection, ShareStatus, UploadFile,
        UploadForm,
    },
    tree::{sort_tree, FolderNode},
    ApiClient, DocumentsApi, DocumentsStore, Session, SortKey,
};

#[derive(Parser)]
#[command(name = "docs_client")]
#[command(about = "Gestión de carpetas, documentos y comparticiones del backend de documentos")]
struct Cli {
    /// URL del backend
    #[arg(long, env = "DOCS_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Árbol de carpetas
    Tree,
    /// Documentos de una carpeta (raíz si no se indica)
    Ls {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        archived: bool,
        /// name | date | size
        #[arg(long, default_value = "name")]
        sort: SortKey,
    },
    /// Crea una carpeta
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Sube un fichero
    Upload {
        path: PathBuf,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value = "")]
        nickname: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Ids de usuario con los que compartir al subir
        #[arg(long = "share-with")]
        share_with: Vec<String>,
    },
    /// Cambia el alias de un documento
    Rename { id: String, nickname: String },
    Archive { id: String },
    Restore { id: String },
    Rm { id: String },
    /// Abre el enlace de descarga en el navegador
    Open { id: String },
    Search {
        query: String,
        #[arg(long)]
        descriptions: bool,
    },
    /// Comparte un documento con uno o varios usuarios
    Share {
        id: String,
        #[arg(required = true)]
        users: Vec<String>,
        #[arg(long)]
        can_share: bool,
        #[arg(long)]
        can_edit: bool,
        #[arg(long)]
        no_download: bool,
        #[arg(long, default_value = "")]
        message: String,
    },
    /// Comparticiones enviadas o recibidas
    Shares {
        /// sent | received
        #[arg(long)]
        direction: Option<ShareDirection>,
        /// pending | accepted | rejected | revoked
        #[arg(long)]
        status: Option<ShareStatus>,
    },
    Accept { id: String },
    Reject { id: String },
    Revoke { id: String },
    /// Notificaciones sin leer
    Notifications,
    /// Marca una notificación como leída
    Read { id: String },
    /// Marca todas las notificaciones como leídas
    ReadAll,
    /// Usuario de la sesión actual
    Whoami,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // 2. Cargar configuración
    let mut cfg = ClientConfig::from_env().context("Error al cargar la configuración")?;
    if let Some(api_url) = &cli.api_url {
        cfg.api_url = normalize_base_url(api_url)?;
    }
    info!("Backend: {}", cfg.api_url);

    // 3. Sesión: token configurado o login con credenciales
    let session = Session::new();
    if let Some(token) = &cfg.access_token {
        session.set_tokens(token.clone(), cfg.refresh_token.clone());
    }
    let client = ApiClient::new(&cfg, session).context("Error creando el cliente HTTP")?;
    if !client.session().is_authenticated() {
        if let (Some(email), Some(password)) = (&cfg.email, &cfg.password) {
            let credentials = Credentials {
                email: email.clone(),
                password: password.clone(),
            };
            auth::login(&client, &credentials)
                .await
                .context("Error iniciando sesión")?;
        }
    }

    let mut store = DocumentsStore::new(DocumentsApi::new(client));
    run(&mut store, cli.command).await?;

    // Un 401 sin sesión deja anotada la pantalla de login
    if let Some(login_url) = store.api().client().session().take_login_redirect() {
        eprintln!("Es necesario iniciar sesión: {login_url}");
        eprintln!("Configura DOCS_ACCESS_TOKEN o DOCS_EMAIL y DOCS_PASSWORD.");
    }
    Ok(())
}

async fn run(store: &mut DocumentsStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Tree => {
            store.fetch_folders().await?;
            let mut tree = store.folder_tree();
            sort_tree(&mut tree);
            if tree.is_empty() {
                println!("(sin carpetas)");
            }
            for node in &tree {
                print_node(node, 0);
            }
        }
        Command::Ls {
            folder,
            archived,
            sort,
        } => {
            store.set_current_folder(folder);
            store.set_show_archived(archived);
            store.set_sort(sort);
            store.fetch_folders().await?;
            store.fetch_documents().await?;
            println!("{}", store.current_folder_path());
            let documents = store.sorted_documents();
            if documents.is_empty() {
                println!("(vacía)");
            }
            for doc in documents {
                print_document(doc);
            }
        }
        Command::Mkdir { name, parent } => {
            let folder = store.create_folder(&name, parent).await?;
            println!("{}\t{}", folder.id, folder.name);
        }
        Command::Upload {
            path,
            folder,
            nickname,
            description,
            share_with,
        } => {
            let file = UploadFile::from_path(&path)
                .await
                .with_context(|| format!("No se pudo leer {}", path.display()))?;
            let mut form = UploadForm::new(file);
            form.folder = folder;
            form.nickname = nickname;
            form.description = description;
            form.share_with = share_with;
            let doc = store.upload_document(form).await?;
            print_document(doc);
        }
        Command::Rename { id, nickname } => {
            let update = DocumentUpdate {
                nickname: Some(nickname),
                ..DocumentUpdate::default()
            };
            let doc = store.update_document(&id, &update).await?;
            print_document(&doc);
        }
        Command::Archive { id } => {
            store.archive_document(&id).await?;
            println!("Archivado: {id}");
        }
        Command::Restore { id } => {
            store.restore_document(&id).await?;
            println!("Restaurado: {id}");
        }
        Command::Rm { id } => {
            store.delete_document(&id).await?;
            println!("Eliminado: {id}");
        }
        Command::Open { id } => {
            let url = store.download_url(&id).await?;
            if webbrowser::open(&url).is_err() {
                info!("No se pudo abrir el navegador. Descarga el fichero manualmente.");
            }
            println!("{url}");
        }
        Command::Search {
            query,
            descriptions,
        } => {
            let params = docs_client::models::SearchParams {
                query,
                include_description: descriptions,
                ..Default::default()
            };
            for doc in store.search_documents(&params).await? {
                print_document(&doc);
            }
        }
        Command::Share {
            id,
            users,
            can_share,
            can_edit,
            no_download,
            message,
        } => {
            let permissions = SharePermissions {
                can_download: !no_download,
                can_share,
                can_edit,
            };
            let share = store.share_document(&id, users, permissions, message).await?;
            println!("{}\t{}\t{}", share.id, share.shared_with_name, share.status);
        }
        Command::Shares { direction, status } => {
            store.fetch_shares(ShareQuery { direction, status }).await?;
            for share in store.shares() {
                println!(
                    "{}\t{}\t{} -> {}\t{}",
                    share.id,
                    share.document_name,
                    share.shared_by_name,
                    share.shared_with_name,
                    share.status
                );
            }
        }
        Command::Accept { id } => answer(store, &id, ShareStatus::Accepted).await?,
        Command::Reject { id } => answer(store, &id, ShareStatus::Rejected).await?,
        Command::Revoke { id } => answer(store, &id, ShareStatus::Revoked).await?,
        Command::Notifications => {
            store.fetch_notifications().await?;
            println!("{} sin leer", store.unread_notification_count());
            for n in store.notifications() {
                println!(
                    "{}\t{}\t{}\t{}",
                    n.id,
                    n.notification_type.as_str(),
                    n.document_name,
                    n.shared_by_name
                );
            }
        }
        Command::Read { id } => {
            store.mark_notification_read(&id).await?;
            println!("Leída: {id}");
        }
        Command::ReadAll => {
            let marked = store.mark_all_notifications_read().await?;
            println!("{marked} notificaciones marcadas como leídas");
        }
        Command::Whoami => {
            let user = auth::current_user(store.api().client()).await?;
            println!("{} <{}>", user.full_name, user.email);
        }
    }
    Ok(())
}

/// Carga las comparticiones para validar la transición antes de enviarla.
async fn answer(store: &mut DocumentsStore, id: &str, next: ShareStatus) -> anyhow::Result<()> {
    store.fetch_shares(ShareQuery::default()).await?;
    match next {
        ShareStatus::Accepted => store.accept_share(id).await?,
        ShareStatus::Rejected => store.reject_share(id).await?,
        ShareStatus::Revoked => store.revoke_share(id).await?,
        ShareStatus::Pending => bail!("Una compartición no puede volver a pendiente"),
    }
    println!("{id}: {next}");
    Ok(())
}

fn print_node(node: &FolderNode, depth: usize) {
    println!(
        "{}{} ({})",
        "  ".repeat(depth),
        node.folder.name,
        node.folder.document_count
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn print_document(doc: &Document) {
    let archived = if doc.is_archived { " [archivado]" } else { "" };
    println!(
        "{}\t{}\t{}\t{} B\t{}{archived}",
        doc.id,
        doc.display_name(),
        doc.file_type,
        doc.file_size,
        doc.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
    );
}
