//! Integration tests for mv

mod common;

use pinfs::client::{ClientError, PutSource};
use pinfs::root::RootError;

#[tokio::test]
async fn test_mv_file() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/old.txt", PutSource::bytes(&b"contents"[..]))
        .await
        .unwrap();
    client.mv("/old.txt", "/new.txt").await.unwrap();

    let items = client.ls("/").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "new.txt");
    assert_eq!(client.cat("/new.txt").await.unwrap().as_ref(), b"contents");

    client.close().await;
}

#[tokio::test]
async fn test_mv_into_directory() {
    let (client, _, _, _temp) = common::setup_client().await;

    client.mkdir("/docs").await.unwrap();
    client
        .put("/readme.md", PutSource::bytes(&b"# hi"[..]))
        .await
        .unwrap();

    client.mv("/readme.md", "/docs/readme.md").await.unwrap();

    let root_items = client.ls("/").await.unwrap();
    assert_eq!(root_items.len(), 1);
    assert_eq!(root_items[0].name, "docs");

    let doc_items = client.ls("/docs").await.unwrap();
    assert_eq!(doc_items.len(), 1);
    assert_eq!(doc_items[0].name, "readme.md");

    client.close().await;
}

#[tokio::test]
async fn test_mv_directory_keeps_subtree() {
    let (client, _, _, _temp) = common::setup_client().await;

    client.mkdir("/a").await.unwrap();
    client
        .put("/a/inner.txt", PutSource::bytes(&b"inner"[..]))
        .await
        .unwrap();

    client.mv("/a", "/b").await.unwrap();

    let items = client.ls("/b").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "inner.txt");
    assert_eq!(client.cat("/b/inner.txt").await.unwrap().as_ref(), b"inner");

    client.close().await;
}

#[tokio::test]
async fn test_mv_missing_source() {
    let (client, _, _, _temp) = common::setup_client().await;

    let result = client.mv("/ghost.txt", "/anywhere.txt").await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::PathNotFound(_)))
    ));

    client.close().await;
}

#[tokio::test]
async fn test_mv_refuses_existing_destination() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/one.txt", PutSource::bytes(&b"one"[..]))
        .await
        .unwrap();
    client
        .put("/two.txt", PutSource::bytes(&b"two"[..]))
        .await
        .unwrap();

    let result = client.mv("/one.txt", "/two.txt").await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::PathAlreadyExists(_)))
    ));

    client.close().await;
}

#[tokio::test]
async fn test_mv_into_own_subtree() {
    let (client, _, _, _temp) = common::setup_client().await;

    client.mkdir("/a").await.unwrap();

    let result = client.mv("/a", "/a/b").await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::MoveIntoSelf { .. }))
    ));

    client.close().await;
}
