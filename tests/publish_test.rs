//! Publish path integration tests

use std::sync::Arc;
use std::time::Duration;

use evermark_core::testing::{offline_gateway, InMemoryLedger, InMemoryUploadSink};
use evermark_core::{CoreError, EvermarkCore, MetadataDraft};

fn build_core(sink: Arc<InMemoryUploadSink>) -> EvermarkCore {
    EvermarkCore::builder()
        .ledger(Arc::new(InMemoryLedger::new()))
        .upload_sink(sink)
        .gateway(Arc::new(offline_gateway()))
        .build()
        .expect("valid core")
}

fn draft(title: &str) -> MetadataDraft {
    MetadataDraft::new(title)
        .with_description("notes")
        .with_source_url("https://example.com/notes")
}

#[tokio::test(start_paused = true)]
async fn test_double_submit_is_rejected() {
    let sink = Arc::new(InMemoryUploadSink::new().with_delay(Duration::from_millis(250)));
    let core = build_core(sink.clone());

    let (first, second) = tokio::join!(core.publish(draft("first")), core.publish(draft("second")));

    assert!(first.is_ok());
    assert!(matches!(second, Err(CoreError::Busy(_))));
    assert_eq!(sink.upload_calls(), 1);

    // idle again once the first publish finished
    assert!(core.publish(draft("third")).await.is_ok());
}

#[tokio::test]
async fn test_published_uri_is_a_content_address() {
    let sink = Arc::new(InMemoryUploadSink::new());
    let core = build_core(sink);

    let published = core.publish(draft("addressable")).await.unwrap();
    assert!(published.metadata_uri.starts_with("ipfs://b"));
    assert_eq!(published.address.to_string(), published.metadata_uri);
}
