//! Integration tests for put

mod common;

use bytes::Bytes;
use futures::stream;
use pinfs::client::{ClientError, PutSource};
use pinfs::linked_data::{Link, LD_RAW_CODEC};
use pinfs::root::{MutableRoot, RootError};

#[tokio::test]
async fn test_put_bytes_records_size() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/notes.txt", PutSource::bytes(&b"hello world"[..]))
        .await
        .unwrap();

    let items = client.ls("/").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "notes.txt");
    assert_eq!(items[0].size, 11);
    assert!(!items[0].is_dir);

    let data = client.cat("/notes.txt").await.unwrap();
    assert_eq!(data.as_ref(), b"hello world");

    client.close().await;
}

#[tokio::test]
async fn test_put_chunked_stream_counts_every_chunk() {
    let (client, _, _, _temp) = common::setup_client().await;

    let chunks = vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"hello ")),
        Ok(Bytes::from_static(b"chunked ")),
        Ok(Bytes::from_static(b"world")),
    ];
    client
        .put(
            "/chunked.txt",
            PutSource::Stream(Box::pin(stream::iter(chunks))),
        )
        .await
        .unwrap();

    let items = client.ls("/").await.unwrap();
    assert_eq!(items[0].size, 19);
    assert_eq!(
        client.cat("/chunked.txt").await.unwrap().as_ref(),
        b"hello chunked world"
    );

    client.close().await;
}

#[tokio::test]
async fn test_put_creates_intermediate_dirs() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/a/b/c.txt", PutSource::bytes(&b"deep"[..]))
        .await
        .unwrap();

    let items = client.ls("/a/b").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "c.txt");

    let root_items = client.ls("/").await.unwrap();
    assert!(root_items[0].is_dir);

    client.close().await;
}

#[tokio::test]
async fn test_put_replaces_existing_entry() {
    let (client, _, _, _temp) = common::setup_client().await;

    client
        .put("/file.txt", PutSource::bytes(&b"old"[..]))
        .await
        .unwrap();
    client
        .put("/file.txt", PutSource::bytes(&b"newer"[..]))
        .await
        .unwrap();

    let items = client.ls("/").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].size, 5);
    assert_eq!(client.cat("/file.txt").await.unwrap().as_ref(), b"newer");

    client.close().await;
}

#[tokio::test]
async fn test_put_existing_identifier() {
    let (client, _, _, _temp) = common::setup_client().await;

    // content already in the store, addressed by identifier
    let hash = client.blocks().put(b"preloaded".to_vec()).await.unwrap();
    let cid = Link::new(LD_RAW_CODEC, hash).to_string();

    client.put("/from_cid.bin", PutSource::cid(cid)).await.unwrap();

    let items = client.ls("/").await.unwrap();
    assert_eq!(items[0].size, 9);
    assert!(!items[0].is_dir);
    assert_eq!(client.cat("/from_cid.bin").await.unwrap().as_ref(), b"preloaded");

    client.close().await;
}

#[tokio::test]
async fn test_put_directory_identifier_keeps_its_kind() {
    let (client, _, _, _temp) = common::setup_client().await;

    // build a small tree out of band and graft it in by identifier
    let mut tree = MutableRoot::init(client.blocks()).await.unwrap();
    tree.mkdir("/inner").await.unwrap();
    let link = tree.flush().await.unwrap();

    client
        .put("/grafted", PutSource::cid(link.to_string()))
        .await
        .unwrap();

    let items = client.ls("/grafted").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "inner");
    assert!(items[0].is_dir);

    client.close().await;
}

#[tokio::test]
async fn test_put_unknown_identifier_fails() {
    let (client, _, _, _temp) = common::setup_client().await;

    let missing = Link::new(LD_RAW_CODEC, iroh_blobs::Hash::from_bytes([42u8; 32]));
    let result = client
        .put("/missing.bin", PutSource::cid(missing.to_string()))
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Root(RootError::LinkNotFound(_)))
    ));

    client.close().await;
}
