//! Integration tests for the post-flush confirmation policy

mod common;

use std::time::Duration;

use pinfs::client::{ClientError, PutSource};
use pinfs::pin::{ConfirmError, ConfirmPolicy, PinProvider};

#[tokio::test]
async fn test_local_flush_is_the_default() {
    let (client, pins, _, _temp) = common::setup_client().await;

    // the default policy never talks to the service
    pins.set_unreachable(true);
    let confirmation = client.mkdir("/dir").await.unwrap();
    assert!(!confirmation.is_pinned());

    client.close().await;
}

#[tokio::test]
async fn test_remote_pin_confirms_each_mutation() {
    let (client, pins, _, _temp) = common::setup_client().await;
    let client = client
        .with_pin_id("pin-1")
        .with_confirm_policy(ConfirmPolicy::remote());

    let confirmation = client
        .put("/file.txt", PutSource::bytes(&b"data"[..]))
        .await
        .unwrap();
    assert!(confirmation.is_pinned());

    // the service now tracks the new root under our pin id
    let record = pins.status_by_id("pin-1").await.unwrap();
    assert_eq!(record.cid, confirmation.link().to_string());
    assert_eq!(client.root_link().await, Some(confirmation.link()));

    client.close().await;
}

#[tokio::test]
async fn test_remote_pin_failure_is_distinct_from_flush_failure() {
    let (client, pins, _, _temp) = common::setup_client().await;
    let client = client
        .with_pin_id("pin-1")
        .with_confirm_policy(ConfirmPolicy::remote());

    pins.set_fail_submissions(true);
    let result = client.mkdir("/dir").await;
    assert!(matches!(
        result,
        Err(ClientError::Confirm(ConfirmError::PinFailed(_)))
    ));

    // the mutation itself was applied and flushed locally
    assert_eq!(client.ls("/").await.unwrap().len(), 1);

    client.close().await;
}

#[tokio::test]
async fn test_remote_pin_timeout_is_bounded() {
    let (client, pins, _, _temp) = common::setup_client().await;
    let client = client
        .with_pin_id("pin-1")
        .with_confirm_policy(ConfirmPolicy::RemotePin {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_millis(60),
        });

    // submissions that never converge
    pins.set_auto_pin(false);
    let result = client.mkdir("/dir").await;
    assert!(matches!(
        result,
        Err(ClientError::Confirm(ConfirmError::Timeout(_)))
    ));

    client.close().await;
}
