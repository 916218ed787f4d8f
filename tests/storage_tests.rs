//! Folder operations over the SQLite + disk backing store

mod common;

use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use tokio::io::AsyncReadExt;

use common::disk_store;
use folder_store::services::{
    folder_service::{FolderService, FolderSettings},
    object_store::{ObjectStore, StoreError},
};

/// Pull `(encoded_key, expires, signature)` out of an issued share URL.
fn split_presigned(url: &str) -> (String, i64, String) {
    let (path, query) = url.split_once('?').unwrap();
    let encoded = path.rsplit('/').next().unwrap().to_string();
    let mut expires = 0;
    let mut signature = String::new();
    for pair in query.split('&') {
        match pair.split_once('=').unwrap() {
            ("expires", value) => expires = value.parse().unwrap(),
            ("signature", value) => signature = value.to_string(),
            _ => {}
        }
    }
    (encoded, expires, signature)
}

#[tokio::test]
async fn test_rename_and_trash_on_disk() {
    let (_dir, store) = disk_store().await;
    for (key, body) in [
        ("site/", ""),
        ("site/index.html", "<h1>hi</h1>"),
        ("site/css/main.css", "body{}"),
        ("site/%_literal.txt", "wildcards"),
        ("sitemap.xml", "<urlset/>"),
    ] {
        store
            .put(key, Bytes::from(body.to_string()), None)
            .await
            .unwrap();
    }
    let service = FolderService::new(Arc::new(store.clone()), FolderSettings::new(".trash", 2));

    let report = service.rename("site/", "www").await.unwrap();
    assert_eq!(report.moved, 4);
    assert!(store.head("site/index.html").await.unwrap().is_none());
    assert!(store.head("sitemap.xml").await.unwrap().is_some());

    let listing = service.list("www/").await.unwrap();
    let folders: Vec<_> = listing.folders.iter().map(|f| f.key.as_str()).collect();
    let files: Vec<_> = listing.files.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(folders, vec!["www/css/"]);
    assert_eq!(files, vec!["www/%_literal.txt", "www/index.html"]);

    let trashed = service.soft_delete("www/index.html").await.unwrap();
    service
        .restore(&trashed.trash_key, "www/index.html")
        .await
        .unwrap();
    let (meta, mut file) = store.get_object_reader("www/index.html").await.unwrap();
    let mut body = String::new();
    file.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "<h1>hi</h1>");
    assert_eq!(meta.size_bytes, 11);
}

#[tokio::test]
async fn test_streamed_upload_and_share_url() {
    let (_dir, store) = disk_store().await;
    let chunks = vec![
        Ok(Bytes::from_static(b"hello ")),
        Ok(Bytes::from_static(b"world")),
    ];
    let object = store
        .upload_object_stream("notes/hello.txt", Some("text/plain".into()), stream::iter(chunks))
        .await
        .unwrap();
    assert_eq!(object.size_bytes, 11);
    assert_eq!(object.etag.as_deref(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));

    let service = FolderService::new(Arc::new(store.clone()), FolderSettings::default());
    let record = service.create_share("notes/hello.txt", 300).await.unwrap();
    assert!(record.issued_url.starts_with("http://localhost:3000/presigned/"));

    let (encoded, expires, signature) = split_presigned(&record.issued_url);
    assert_eq!(
        store.verify_presigned(&encoded, expires, &signature).unwrap(),
        "notes/hello.txt"
    );
    assert!(matches!(
        store.verify_presigned(&encoded, expires + 1, &signature),
        Err(StoreError::InvalidSignature(_))
    ));
    assert!(matches!(
        store.verify_presigned(&encoded, 1, &signature),
        Err(StoreError::InvalidSignature(_))
    ));

    let found = service.lookup_share(&record.token).await.unwrap();
    let metadata = found.metadata.unwrap();
    assert_eq!(metadata.content_type.as_deref(), Some("text/plain"));
    assert_eq!(metadata.size, 11);
}

#[tokio::test]
async fn test_delete_folder_on_disk() {
    let (_dir, store) = disk_store().await;
    for key in ["tmp/", "tmp/a", "tmp/b/c"] {
        store.put(key, Bytes::from_static(b"x"), None).await.unwrap();
    }
    let service = FolderService::new(Arc::new(store.clone()), FolderSettings::default());

    let report = service.delete("tmp/").await.unwrap();

    assert_eq!(report.deleted, vec!["tmp/", "tmp/a", "tmp/b/c"]);
    assert!(service.list("").await.unwrap().folders.is_empty());
    assert!(matches!(
        store.get_object_metadata("tmp/a").await,
        Err(StoreError::ObjectNotFound { .. })
    ));
}
