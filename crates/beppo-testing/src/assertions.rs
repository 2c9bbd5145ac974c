//! Common assertions for beppo testing

use anyhow::Result;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, ObjectStore};
use std::path::Path;

/// Asserts that a local file holds exactly `expected`
pub fn assert_file_bytes(path: &Path, expected: &[u8]) -> Result<()> {
    let actual = std::fs::read(path)?;
    assert_eq!(
        actual.len(),
        expected.len(),
        "Size mismatch for {}: {} vs {} bytes",
        path.display(),
        actual.len(),
        expected.len()
    );
    assert!(actual == expected, "Content mismatch for {}", path.display());
    Ok(())
}

/// Asserts that `location` exists in `store` with exactly `expected` as its body
pub fn assert_object_bytes(store: &dyn ObjectStore, location: &str, expected: &[u8]) -> Result<()> {
    let path = ObjectPath::parse(location)?;
    let actual = crate::block_on(async { store.get(&path).await?.bytes().await })?;
    assert_eq!(
        actual.len(),
        expected.len(),
        "Size mismatch for object {}",
        location
    );
    assert!(actual == expected, "Content mismatch for object {}", location);
    Ok(())
}

/// Content type recorded for `location`, if any
pub fn object_content_type(store: &dyn ObjectStore, location: &str) -> Result<Option<String>> {
    let path = ObjectPath::parse(location)?;
    let result = crate::block_on(store.get(&path))?;
    Ok(result
        .attributes
        .get(&Attribute::ContentType)
        .map(|value| AsRef::<str>::as_ref(value).to_string()))
}
