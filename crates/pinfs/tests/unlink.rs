//! Integration tests for unlink

mod common;

use pinfs::client::{ClientError, PutSource};
use pinfs::root::RootError;

#[tokio::test]
async fn test_unlink_file() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/doomed.txt", PutSource::bytes(&b"bye"[..]))
        .await
        .unwrap();
    assert_eq!(client.ls("/").await.unwrap().len(), 1);

    client.unlink("/", "doomed.txt").await.unwrap();
    assert!(client.ls("/").await.unwrap().is_empty());

    client.close().await;
}

#[tokio::test]
async fn test_unlink_in_subdirectory() {
    let (client, _, _, _temp) = common::setup_client().await;

    client.mkdir("/docs").await.unwrap();
    client
        .put("/docs/a.txt", PutSource::bytes(&b"a"[..]))
        .await
        .unwrap();
    client
        .put("/docs/b.txt", PutSource::bytes(&b"b"[..]))
        .await
        .unwrap();

    client.unlink("/docs", "a.txt").await.unwrap();

    let items = client.ls("/docs").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "b.txt");

    client.close().await;
}

#[tokio::test]
async fn test_unlink_missing_name() {
    let (client, _, _, _temp) = common::setup_client().await;

    let result = client.unlink("/", "ghost.txt").await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::PathNotFound(_)))
    ));

    client.close().await;
}

#[tokio::test]
async fn test_unlink_parent_must_be_directory() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/file.txt", PutSource::bytes(&b"data"[..]))
        .await
        .unwrap();

    let result = client.unlink("/file.txt", "anything").await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::NotADirectory(_)))
    ));

    client.close().await;
}

#[tokio::test]
async fn test_unlink_directory() {
    let (client, _, _, _temp) = common::setup_client().await;

    client.mkdir("/scratch").await.unwrap();
    client.unlink("/", "scratch").await.unwrap();

    assert!(client.ls("/").await.unwrap().is_empty());

    client.close().await;
}
