//! Sincronización del store contra un backend simulado con wiremock.

use docs_client::{
    api::ShareQuery,
    auth::{self, Credentials},
    models::{
        DocumentUpdate, SearchParams, SharePermissions, ShareStatus, UploadFile, UploadForm,
    },
    ApiClient, ApiError, ClientConfig, DocumentsApi, DocumentsStore, Session, SortKey,
};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(Url::parse(&server.uri()).unwrap())
}

fn store_with(server: &MockServer, session: Session) -> DocumentsStore {
    let client = ApiClient::new(&config(server), session).unwrap();
    DocumentsStore::new(DocumentsApi::new(client))
}

fn store(server: &MockServer) -> DocumentsStore {
    store_with(server, Session::with_token("tok"))
}

fn folder(id: &str, name: &str, parent: Option<&str>) -> Value {
    json!({
        "id": id,
        "name": name,
        "parent": parent,
        "documentCount": 0,
        "fullPath": "",
        "isExpanded": false,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

fn document(id: &str, name: &str, folder: Option<&str>) -> Value {
    json!({
        "id": id,
        "folder": folder,
        "originalName": name,
        "nickname": "",
        "fileType": "pdf",
        "fileSize": 100,
        "isArchived": false,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z"
    })
}

fn share(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "document": "d1",
        "documentName": "Contrato",
        "sharedBy": 7,
        "sharedWith": "9",
        "status": status,
        "sharedAt": "2024-01-01T00:00:00Z"
    })
}

fn notification(id: &str) -> Value {
    json!({
        "id": id,
        "documentShare": "s1",
        "notificationType": "share_received",
        "isRead": false,
        "createdAt": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn fetch_folders_accepts_direct_and_paginated_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            folder("f1", "Contratos", None),
            folder("f2", "2024", Some("f1")),
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [folder("f9", "Facturas", None)]
        })))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_folders().await.unwrap();
    assert_eq!(store.folders().len(), 2);
    let tree = store.folder_tree();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children[0].folder.full_path, "Contratos/2024");

    store.fetch_folders().await.unwrap();
    assert_eq!(store.folders().len(), 1);
    assert_eq!(store.folders()[0].id, "f9");
}

#[tokio::test]
async fn rejected_token_empties_collection_and_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([document("d1", "a.pdf", None)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();
    assert_eq!(store.documents().len(), 1);

    store.fetch_documents().await.unwrap();
    assert!(store.documents().is_empty());
    let session = store.api().client().session();
    assert!(!session.is_authenticated());
    assert_eq!(session.take_login_redirect(), None);
}

#[tokio::test]
async fn missing_session_records_login_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut store = store_with(&server, Session::new());
    store.fetch_folders().await.unwrap();
    assert!(store.folders().is_empty());

    let expected = format!("{}/login", server.uri());
    let session = store.api().client().session();
    assert_eq!(session.take_login_redirect(), Some(expected.clone()));

    let err = store.api().list_folders(None).await.unwrap_err();
    assert!(matches!(err, ApiError::LoginRequired { ref login_url } if *login_url == expected));
}

#[tokio::test]
async fn unexpected_shape_empties_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([notification("n1")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "ok" })))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_notifications().await.unwrap();
    assert_eq!(store.unread_notification_count(), 1);
    store.fetch_notifications().await.unwrap();
    assert!(store.notifications().is_empty());
}

#[tokio::test]
async fn html_body_empties_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([folder("f1", "Contratos", None)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_folders().await.unwrap();
    assert_eq!(store.folders().len(), 1);

    store.fetch_folders().await.unwrap();
    assert!(store.folders().is_empty());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn forbidden_read_empties_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([document("d1", "a.pdf", None)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();
    assert_eq!(store.documents().len(), 1);

    store.fetch_documents().await.unwrap();
    assert!(store.documents().is_empty());
    assert!(store.api().client().session().is_authenticated());
}

#[tokio::test]
async fn loading_flag_drops_after_share_and_notification_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/shares/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([notification("n1")])))
        .mount(&server)
        .await;

    let mut store = store(&server);
    assert!(store.fetch_shares(ShareQuery::default()).await.is_err());
    assert!(!store.is_loading());
    store.fetch_notifications().await.unwrap();
    assert!(!store.is_loading());
    assert_eq!(store.notifications().len(), 1);
}

#[tokio::test]
async fn server_error_propagates_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([document("d1", "a.pdf", None)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();
    let err = store.fetch_documents().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, ref message } if message == "boom"));
    assert_eq!(store.documents().len(), 1);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn fetch_documents_sends_view_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .and(query_param("folder", "f1"))
        .and(query_param("archived", "true"))
        .and(query_param("sort", "size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.set_current_folder(Some("f1".into()));
    store.set_show_archived(true);
    store.set_sort(SortKey::Size);
    store.fetch_documents().await.unwrap();
}

#[tokio::test]
async fn refresh_applies_every_listing_and_reports_first_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            folder("f1", "Contratos", None),
            folder("x", "Huérfana", Some("nadie")),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/"))
        .and(query_param("is_read", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            notification("n1"),
            notification("n2"),
        ])))
        .mount(&server)
        .await;

    let mut store = store(&server);
    let err = store.refresh().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 503, .. }));
    assert_eq!(store.folders().len(), 2);
    assert_eq!(store.folder_tree().len(), 1);
    assert_eq!(store.unread_notification_count(), 2);
    assert!(store.documents().is_empty());
}

#[tokio::test]
async fn upload_archive_and_delete_patch_local_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            document("d1", "b.pdf", None),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/upload/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(document("d2", "a.pdf", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/d1/archive/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "archived" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/files/d2/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();

    let mut form = UploadForm::new(UploadFile::new("a.pdf", b"%PDF-1.4".to_vec()));
    form.nickname = "Alias".into();
    let uploaded = store.upload_document(form).await.unwrap();
    assert_eq!(uploaded.id, "d2");

    let names: Vec<&str> = store.sorted_documents().iter().map(|d| d.display_name()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);

    store.archive_document("d1").await.unwrap();
    let archived = store.documents().iter().find(|d| d.id == "d1").unwrap();
    assert!(archived.is_archived);
    assert!(archived.archived_at.is_some());
    let visible: Vec<&str> = store.sorted_documents().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(visible, vec!["d2"]);

    store.toggle_selection("d2");
    store.delete_document("d2").await.unwrap();
    assert_eq!(store.documents().len(), 1);
    assert!(store.selected_documents().is_empty());
}

#[tokio::test]
async fn update_document_replaces_local_record() {
    let server = MockServer::start().await;
    let mut updated = document("d1", "a.pdf", None);
    updated["nickname"] = json!("Contrato firmado");
    Mock::given(method("PATCH"))
        .and(path("/api/v1/files/d1/"))
        .and(body_json(json!({ "nickname": "Contrato firmado" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store(&server);
    let update = DocumentUpdate {
        nickname: Some("Contrato firmado".into()),
        ..DocumentUpdate::default()
    };
    let doc = store.update_document("d1", &update).await.unwrap();
    assert_eq!(doc.display_name(), "Contrato firmado");
    assert_eq!(store.documents()[0].display_name(), "Contrato firmado");
}

#[tokio::test]
async fn failed_write_leaves_collection_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([document("d1", "a.pdf", None)])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/files/d1/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();
    let err = store.delete_document("d1").await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
    assert_eq!(store.documents().len(), 1);
}

#[tokio::test]
async fn create_folder_and_toggle_expanded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/"))
        .and(body_json(json!({ "name": "Facturas", "parent": null })))
        .respond_with(ResponseTemplate::new(201).set_body_json(folder("f1", "Facturas", None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/folders/f1/toggle_expand/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_expanded": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.create_folder("Facturas", None).await.unwrap();
    assert_eq!(store.folder_tree().len(), 1);

    assert_eq!(store.toggle_folder_expanded("f1").await.unwrap(), Some(true));
    assert!(store.folders()[0].is_expanded);
    assert_eq!(store.toggle_folder_expanded("desconocida").await.unwrap(), None);

    store.set_current_folder(Some("f1".into()));
    assert_eq!(store.current_folder_path(), "Facturas");
    store.set_current_folder(Some("otra".into()));
    assert_eq!(store.current_folder_path(), "/");
}

#[tokio::test]
async fn share_lifecycle_validates_transitions_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/shares/"))
        .and(query_param("type", "received"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            share("s1", "pending"),
            share("s2", "rejected"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/shares/s1/accept/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "accepted" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/shares/s2/accept/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut store = store(&server);
    store
        .fetch_shares(ShareQuery {
            direction: Some("received".parse().unwrap()),
            status: None,
        })
        .await
        .unwrap();

    store.accept_share("s1").await.unwrap();
    let accepted = &store.shares()[0];
    assert_eq!(accepted.status, ShareStatus::Accepted);
    assert!(accepted.responded_at.is_some());

    let err = store.accept_share("s2").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::InvalidTransition {
            from: ShareStatus::Rejected,
            to: ShareStatus::Accepted
        }
    ));
    assert_eq!(store.shares()[1].status, ShareStatus::Rejected);
}

#[tokio::test]
async fn share_document_posts_permissions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/shares/"))
        .and(body_json(json!({
            "document": "d1",
            "shared_with": ["9"],
            "can_download": true,
            "can_share": false,
            "can_edit": true,
            "message": "Revisa esto"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(share("s5", "pending")))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = store(&server);
    let permissions = SharePermissions {
        can_edit: true,
        ..SharePermissions::default()
    };
    let created = store
        .share_document("d1", vec!["9".into()], permissions, "Revisa esto")
        .await
        .unwrap();
    assert_eq!(created.shared_by, "7");
    assert_eq!(store.shares().len(), 1);
}

#[tokio::test]
async fn mark_all_read_zeroes_unread_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            notification("n1"),
            notification("n2"),
            notification("n3"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/notifications/n1/mark_read/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "read" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/notifications/mark_all_read/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "marked_read": 2 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread_count/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unread_count": 0 })))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_notifications().await.unwrap();
    assert_eq!(store.unread_notification_count(), 3);

    store.mark_notification_read("n1").await.unwrap();
    assert_eq!(store.unread_notification_count(), 2);
    let first_read = store.notifications()[0].read_at;

    assert_eq!(store.mark_all_notifications_read().await.unwrap(), 2);
    assert_eq!(store.unread_notification_count(), 0);
    assert_eq!(store.notifications()[0].read_at, first_read);
    assert_eq!(store.fetch_unread_count().await.unwrap(), 0);
}

#[tokio::test]
async fn search_does_not_touch_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([document("d1", "a.pdf", None)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/files/search/"))
        .and(body_json(json!({
            "query": "factura",
            "includeDescription": true,
            "folder": null,
            "fileTypes": [],
            "archived": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "results": [document("d7", "factura.pdf", None), document("d8", "factura2.pdf", None)]
        })))
        .mount(&server)
        .await;

    let mut store = store(&server);
    store.fetch_documents().await.unwrap();
    let params = SearchParams {
        query: "factura".into(),
        include_description: true,
        ..SearchParams::default()
    };
    let found = store.search_documents(&params).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.documents()[0].id, "d1");
}

#[tokio::test]
async fn login_stores_tokens_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(json!({ "username": "ana@example.com", "password": "secreto" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "acc",
            "refresh": "ref",
            "user": { "id": 3, "email": "ana@example.com", "first_name": "Ana", "last_name": "Ruiz" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/folders/"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config(&server), Session::new()).unwrap();
    let credentials = Credentials {
        email: "ana@example.com".into(),
        password: "secreto".into(),
    };
    auth::login(&client, &credentials).await.unwrap();

    let session = client.session();
    assert_eq!(session.access_token().as_deref(), Some("acc"));
    assert_eq!(session.refresh_token().as_deref(), Some("ref"));
    let user = session.user().unwrap();
    assert_eq!(user.id, "3");
    assert_eq!(user.full_name, "Ana Ruiz");

    let mut store = DocumentsStore::new(DocumentsApi::new(client.clone()));
    store.fetch_folders().await.unwrap();

    auth::logout(&client);
    assert!(!client.session().is_authenticated());
    assert!(client.session().take_login_redirect().is_some());
}
