mod support;

use common::crypto::ShareMap;
use common::download::{DownloadError, DownloadParams, ItemError};
use common::privacy::{PrivacyError, PrivacyStrategy, PrivacyType, Scheme, ThresholdSharedStrategy};
use common::upload::{DataItem, UploadParams};
use support::setup;

fn pick(shares: &ShareMap, indices: &[u8]) -> ShareMap {
    indices.iter().map(|i| (*i, shares[i].clone())).collect()
}

#[tokio::test]
async fn test_threshold_three_of_five() {
    let env = setup().await;
    let (strategy, shares) = ThresholdSharedStrategy::generate(5, 3).unwrap();
    let strategy: PrivacyStrategy = Scheme::ThresholdShared(strategy).into();

    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("quorum only"))
        .item(DataItem::from_bytes(vec![0u8; 2048]))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    assert_eq!(uploaded.manifest.privacy_type(), PrivacyType::ThresholdShared);

    for subset in [[1u8, 3, 5], [2, 4, 5]] {
        let holder = PrivacyStrategy::threshold_shared(5, 3, pick(&shares, &subset)).unwrap();
        let result = env
            .downloader
            .download(DownloadParams::root(uploaded.root_hash, &holder))
            .await
            .unwrap();
        assert_eq!(result.items[0].data.as_ref().unwrap(), b"quorum only");
        assert_eq!(result.items[1].data.as_ref().unwrap(), &vec![0u8; 2048]);
    }

    let short = PrivacyStrategy::threshold_shared(5, 3, pick(&shares, &[1, 2])).unwrap();
    let err = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &short))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DownloadError::Decryption {
            source: PrivacyError::InsufficientShares {
                required: 3,
                supplied: 2
            },
            ..
        }
    ));
}

#[tokio::test]
async fn test_threshold_entry_needs_quorum_too() {
    let env = setup().await;
    let (strategy, shares) = ThresholdSharedStrategy::generate(3, 2).unwrap();
    let strategy: PrivacyStrategy = Scheme::ThresholdShared(strategy).into();
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("x"))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let single = PrivacyStrategy::threshold_shared(3, 2, pick(&shares, &[3])).unwrap();
    let err = env
        .downloader
        .download_entry(&uploaded.manifest.data()[0], &single)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ItemError::Decryption {
            source: PrivacyError::InsufficientShares { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_shared_key_between_sender_and_recipient() {
    let env = setup().await;
    let outgoing = PrivacyStrategy::shared_key(&env.sender, &env.recipient.public()).unwrap();
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("for your eyes"))
        .strategy(&outgoing)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();
    assert_eq!(uploaded.manifest.privacy_type(), PrivacyType::SharedKey);

    let incoming = PrivacyStrategy::shared_key(&env.recipient, &env.sender.public()).unwrap();
    let result = env
        .downloader
        .download(DownloadParams::transaction(uploaded.transaction, &incoming))
        .await
        .unwrap();
    assert_eq!(result.items[0].data.as_ref().unwrap(), b"for your eyes");

    let outsider = common::crypto::SecretKey::generate().unwrap();
    let snooping = PrivacyStrategy::shared_key(&outsider, &env.sender.public()).unwrap();
    assert!(env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &snooping))
        .await
        .is_err());
}

#[tokio::test]
async fn test_plain_strategy_cannot_read_encrypted_upload() {
    let env = setup().await;
    let strategy = support::password_strategy(support::PASSWORD);
    let params = UploadParams::builder(&env.sender, env.recipient.public())
        .item(DataItem::from_text("secret"))
        .strategy(&strategy)
        .build()
        .unwrap();
    let uploaded = env.uploader.upload(params).await.unwrap();

    let plain = PrivacyStrategy::plain();
    let err = env
        .downloader
        .download(DownloadParams::root(uploaded.root_hash, &plain))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::ManifestParse { .. }));
}
