use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};

use crate::errors::StoreError;
use crate::photo::{self, PhotoReference};
use crate::store::PhotoStore;

/// Keeps decoded photos in memory, keyed by identity key.
#[derive(Default)]
pub(crate) struct MockStore {
    pub(crate) map: RwLock<HashMap<String, Vec<u8>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }
}

impl PhotoStore for MockStore {
    fn save<'a>(
        &'a self,
        image_data: &'a str,
        identity_key: &'a str,
    ) -> BoxFuture<'a, Result<PhotoReference, StoreError>> {
        mock_save(self, image_data, identity_key).boxed()
    }
}

async fn mock_save(
    store: &MockStore,
    image_data: &str,
    identity_key: &str,
) -> Result<PhotoReference, StoreError> {
    let raw = photo::decode(image_data)?;
    store
        .map
        .write()
        .unwrap()
        .insert(identity_key.to_owned(), raw);

    Ok(PhotoReference::new(format!("memory/{}.jpeg", identity_key)))
}
