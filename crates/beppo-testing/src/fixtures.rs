//! Common test fixtures for beppo testing

use anyhow::Result;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

/// Deterministic non-text payload covering every byte value
pub fn binary_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// Keys used by the listing tests, in lexicographic order
pub fn listing_keys() -> Vec<&'static str> {
    vec![
        "logs/2024-01-01.txt",
        "logs/2024-01-02.txt",
        "logs/2025-01-01.txt",
        "logsheet.csv",
        "media/cat.png",
        "media/dog.png",
        "readme.md",
    ]
}

/// Put every key of [`listing_keys`] into `store`, each holding its own name
pub fn seed_listing_keys(store: &dyn ObjectStore) -> Result<()> {
    crate::block_on(async {
        for key in listing_keys() {
            let payload = PutPayload::from(Bytes::from_static(key.as_bytes()));
            store.put(&ObjectPath::parse(key)?, payload).await?;
        }
        Ok::<_, object_store::Error>(())
    })?;
    Ok(())
}
