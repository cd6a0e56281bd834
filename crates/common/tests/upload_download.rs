mod support;

use std::collections::BTreeMap;

use common::crypto::digest;
use common::download::{DownloadError, DownloadParams, ItemError, ItemSelector};
use common::ledger::Ledger;
use common::manifest::StoreType;
use common::privacy::{PrivacyStrategy, PrivacyType};
use common::upload::{DataItem, UploadError, UploadParams};
use support::{password_strategy, setup, PASSWORD};
use tempfile::TempDir;

#[tokio::test]
async fn test_password_round_trip_with_file() {
    let env = setup().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    let file_bytes: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    std::fs::write(&path, &file_bytes).unwrap();

    let strategy = password_strategy(PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("hello").with_description("greeting").unwrap())
        .item(DataItem::from_file(&path))
        .strategy(&strategy)
        .description("two things")
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    assert_eq!(env.store.puts(), 3);
    assert_eq!(uploaded.manifest.privacy_type(), PrivacyType::Password);
    assert_eq!(uploaded.manifest.data().len(), 2);
    assert_eq!(uploaded.manifest.data()[1].name.as_deref(), Some("photo.png"));
    assert_eq!(
        uploaded.manifest.data()[1].content_type.as_deref(),
        Some("image/png")
    );
    assert!(uploaded.root_digest.is_some());
    for entry in uploaded.manifest.data() {
        assert!(entry.digest.is_some());
        assert!(entry.timestamp > 0);
    }

    let result = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &strategy))
        .await
        .unwrap();
    assert!(result.is_complete());
    assert_eq!(result.manifest, uploaded.manifest);
    assert_eq!(result.items[0].data.as_ref().unwrap(), b"hello");
    assert_eq!(result.items[1].data.as_ref().unwrap(), &file_bytes);
}

#[tokio::test]
async fn test_stored_bytes_are_not_plaintext() {
    let env = setup().await;
    let strategy = password_strategy(PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("hello, hello, hello"))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let entry = &uploaded.manifest.data()[0];
    let plain = PrivacyStrategy::plain();
    let raw = env
        .downloader
        .download_entry(entry, &plain)
        .await
        .unwrap();
    assert!(!raw.windows(5).any(|w| w == b"hello"));
    assert!(digest::validate(&raw, entry.digest.as_ref().unwrap()));
}

#[tokio::test]
async fn test_wrong_password_fails_on_root() {
    let env = setup().await;
    let strategy = password_strategy(PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("hello"))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let wrong = password_strategy(&PASSWORD.replace('e', "3"));
    let err = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &wrong))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Decryption { .. }));
}

#[tokio::test]
async fn test_zero_items_never_reach_the_store() {
    let env = setup().await;
    let err = UploadParams::builder(&env.sender, env.recipient.public())
        .build()
        .unwrap_err();
    assert!(matches!(err, UploadError::Validation(_)));
    assert_eq!(env.store.puts(), 0);
    assert!(env.ledger.is_empty());
}

#[tokio::test]
async fn test_unreadable_item_aborts_upload() {
    let env = setup().await;
    let dir = TempDir::new().unwrap();
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("fine"))
        .item(DataItem::from_file(dir.path().join("missing.txt")))
        .concurrency(1)
        .build()
        .unwrap();

    let err = env.uploader.upload(params).await.unwrap_err();
    assert!(matches!(err, UploadError::Read { index: 1, .. }));
    // only the first item was written; no manifest, no anchor
    assert_eq!(env.store.puts(), 1);
    assert!(env.ledger.is_empty());
}

#[tokio::test]
async fn test_download_by_transaction() {
    let env = setup().await;
    let strategy = PrivacyStrategy::plain().with_search_tag("reports");
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_bytes(vec![1, 2, 3]))
        .strategy(&strategy)
        .store_type(StoreType::Inline)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let record = env.ledger.resolve(&uploaded.transaction).await.unwrap();
    assert_eq!(record.root_hash, uploaded.root_hash);
    assert_eq!(record.digest, uploaded.root_digest);
    assert_eq!(record.sender, env.sender.public());
    assert_eq!(record.recipient, env.recipient.public());

    let result = env
        .downloader
        .download(DownloadParams::transaction(uploaded.transaction, &strategy))
        .await
        .unwrap();
    assert_eq!(result.transaction, Some(uploaded.transaction));
    assert_eq!(result.root_hash, uploaded.root_hash);
    assert_eq!(result.root_digest, uploaded.root_digest);
    assert_eq!(result.manifest.privacy_search_tag(), Some("reports"));
    assert_eq!(result.manifest.store_type(), StoreType::Inline);
    assert_eq!(result.items[0].data.as_ref().unwrap(), &[1, 2, 3]);
}

#[tokio::test]
async fn test_root_digest_mismatch_aborts_before_items() {
    let env = setup().await;
    let strategy = PrivacyStrategy::plain();
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("a"))
        .item(DataItem::from_text("b"))
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let wrong = digest::digest(b"something else");
    let gets_before = env.store.gets();
    let err = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &strategy).with_root_digest(wrong))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::DigestMismatch { .. }));
    // the root was fetched, nothing else
    assert_eq!(env.store.gets(), gets_before + 1);
}

#[tokio::test]
async fn test_tampered_root_caught_by_anchored_digest() {
    let env = setup().await;
    let strategy = PrivacyStrategy::plain();
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("a"))
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    env.store.corrupt(uploaded.root_hash).await;

    let err = env
        .downloader
        .download(DownloadParams::transaction(uploaded.transaction, &strategy))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::DigestMismatch { .. }));
}

#[tokio::test]
async fn test_item_failures_are_reported_per_item() {
    let env = setup().await;
    let strategy = password_strategy(PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .items((0..3).map(|i| DataItem::from_text(format!("item {}", i))))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    env.store.corrupt(uploaded.manifest.data()[1].data_hash).await;

    let result = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &strategy))
        .await
        .unwrap();
    assert!(!result.is_complete());
    assert_eq!(result.items[0].data.as_ref().unwrap(), b"item 0");
    assert!(matches!(
        result.items[1].data,
        Err(ItemError::DigestMismatch { .. })
    ));
    assert_eq!(result.items[2].data.as_ref().unwrap(), b"item 2");
}

#[tokio::test]
async fn test_corruption_without_digest_fails_decryption() {
    let env = setup().await;
    let strategy = password_strategy(PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("guarded by the AEAD tag only"))
        .strategy(&strategy)
        .compute_digest(false)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    assert!(uploaded.root_digest.is_none());
    assert!(uploaded.manifest.data()[0].digest.is_none());

    env.store.corrupt(uploaded.manifest.data()[0].data_hash).await;
    let result = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &strategy))
        .await
        .unwrap();
    assert!(matches!(
        result.items[0].data,
        Err(ItemError::Decryption { .. })
    ));
}

#[tokio::test]
async fn test_selectors_keep_request_order() {
    let env = setup().await;
    let strategy = PrivacyStrategy::plain();
    let metadata = BTreeMap::from([("author".to_string(), "ops".to_string())]);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("zero"))
        .item(DataItem::from_text("one").with_metadata(metadata.clone()).unwrap())
        .item(DataItem::from_text("two"))
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    let hash_of_one = uploaded.manifest.data()[1].data_hash;

    let missing = common::store::ContentHash::of(b"not uploaded");
    let result = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &strategy).select([
            ItemSelector::Index(2),
            ItemSelector::DataHash(hash_of_one),
            ItemSelector::Index(7),
            ItemSelector::DataHash(missing),
        ]))
        .await
        .unwrap();

    assert_eq!(result.items.len(), 4);
    assert_eq!(result.items[0].data.as_ref().unwrap(), b"two");
    assert_eq!(result.items[1].data.as_ref().unwrap(), b"one");
    assert_eq!(
        result.items[1].entry.as_ref().unwrap().metadata.as_ref(),
        Some(&metadata)
    );
    assert!(matches!(
        result.items[2].data,
        Err(ItemError::NotInManifest(ItemSelector::Index(7)))
    ));
    assert!(result.items[2].entry.is_none());
    assert!(matches!(
        result.items[3].data,
        Err(ItemError::NotInManifest(ItemSelector::DataHash(_)))
    ));
}

#[tokio::test]
async fn test_same_content_same_hash_under_plain() {
    let env = setup().await;
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("dup"))
        .item(DataItem::from_text("dup"))
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    let data = uploaded.manifest.data();
    assert_eq!(data[0].data_hash, data[1].data_hash);
}
