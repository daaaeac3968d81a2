use std::sync::Arc;

use sealkit_common::logging::{Component, Logger};
use sealkit_keys::*;

fn logger(component: Component) -> Arc<Logger> {
    Arc::new(Logger::new_root(component, "test"))
}

async fn shared_cipher() -> Arc<EnvelopeCipher> {
    let provider = Arc::new(SoftwareKeyProvider::new(
        Arc::new(AlwaysAllow),
        logger(Component::Provider),
    ));
    provider
        .generate_symmetric("data-key", &SymmetricKeyConfig::default())
        .await
        .expect("failed to generate symmetric key");
    provider
        .generate_asymmetric_pair("wrap-key", &AsymmetricKeyConfig::default())
        .await
        .expect("failed to generate asymmetric pair");
    Arc::new(EnvelopeCipher::new(
        provider,
        CipherOptions::default(),
        logger(Component::Cipher),
    ))
}

#[tokio::test]
async fn write_then_read_roundtrip_symmetric_and_hybrid() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");

    for (mode, alias, name) in [
        (StreamMode::Symmetric, "data-key", "sym.sealed"),
        (StreamMode::Hybrid, "wrap-key", "hyb.sealed"),
    ] {
        let path = dir.path().join(name);

        let mut writer = SecureFileStream::new(
            &path,
            alias,
            mode,
            cipher.clone(),
            logger(Component::FileStream),
        );
        writer
            .write_all(b"file payload")
            .await
            .expect("write failed");
        drop(writer);

        // On disk is an envelope, not cleartext
        let raw = tokio::fs::read(&path).await.expect("raw read failed");
        assert!(!raw.windows(12).any(|w| w == b"file payload"));

        let mut reader = SecureFileStream::new(
            &path,
            alias,
            mode,
            cipher.clone(),
            logger(Component::FileStream),
        );
        assert_eq!(reader.read_all().await.expect("read failed"), b"file payload");
    }
}

#[tokio::test]
async fn second_write_is_rejected() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("once.sealed");

    let mut stream = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher,
        logger(Component::FileStream),
    );
    stream.write_all(b"first").await.expect("write failed");
    assert!(matches!(
        stream.write_all(b"second").await,
        Err(KeyError::UnsupportedPartialIo(_))
    ));
}

#[tokio::test]
async fn write_after_read_is_rejected() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("ro.sealed");

    let mut writer = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher.clone(),
        logger(Component::FileStream),
    );
    writer.write_all(b"payload").await.expect("write failed");
    drop(writer);

    let mut reader = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher,
        logger(Component::FileStream),
    );
    reader.read_all().await.expect("read failed");
    assert!(matches!(
        reader.write_all(b"overwrite").await,
        Err(KeyError::UnsupportedPartialIo(_))
    ));
}

#[tokio::test]
async fn repeated_reads_serve_the_cache() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("cache.sealed");

    let mut writer = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher.clone(),
        logger(Component::FileStream),
    );
    writer.write_all(b"cached payload").await.expect("write failed");
    drop(writer);

    let mut reader = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher,
        logger(Component::FileStream),
    );
    assert_eq!(reader.read_all().await.expect("first read"), b"cached payload");

    // Corrupt the file after the first read; the cache must still serve.
    tokio::fs::write(&path, b"garbage").await.expect("overwrite failed");
    assert_eq!(reader.read_all().await.expect("second read"), b"cached payload");
}

#[tokio::test]
async fn closed_stream_rejects_all_io() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("closed.sealed");

    let mut writer = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher.clone(),
        logger(Component::FileStream),
    );
    writer.write_all(b"payload").await.expect("write failed");
    drop(writer);

    let mut stream = SecureFileStream::new(
        &path,
        "data-key",
        StreamMode::Symmetric,
        cipher,
        logger(Component::FileStream),
    );
    stream.read_all().await.expect("read failed");
    stream.close();
    stream.close(); // idempotent

    assert!(matches!(stream.read_all().await, Err(KeyError::StreamClosed)));
    assert!(matches!(
        stream.write_all(b"late").await,
        Err(KeyError::StreamClosed)
    ));
}

#[tokio::test]
async fn missing_file_surfaces_io_error() {
    let cipher = shared_cipher().await;
    let dir = tempfile::tempdir().expect("tempdir failed");

    let mut stream = SecureFileStream::new(
        dir.path().join("absent.sealed"),
        "data-key",
        StreamMode::Symmetric,
        cipher,
        logger(Component::FileStream),
    );
    assert!(matches!(
        stream.read_all().await,
        Err(KeyError::IoError(_))
    ));
}
