use std::io;
use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::errors::StoreError;
use crate::photo::{self, PhotoReference};

#[cfg(test)]
pub(crate) mod mock;

const MAX_ATTEMPTS: u32 = 5;

pub trait PhotoStore: Send + Sync {
    /// Decodes `image_data` and saves it under a new name derived from
    /// `identity_key`. Never overwrites an existing photo.
    fn save<'a>(
        &'a self,
        image_data: &'a str,
        identity_key: &'a str,
    ) -> BoxFuture<'a, Result<PhotoReference, StoreError>>;
}

/// A store that writes photos into a directory on the local disk.
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Creates a new instance. The directory is created lazily, on the
    /// first save.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }
}

impl PhotoStore for FileStore {
    fn save<'a>(
        &'a self,
        image_data: &'a str,
        identity_key: &'a str,
    ) -> BoxFuture<'a, Result<PhotoReference, StoreError>> {
        write(self, image_data, identity_key).boxed()
    }
}

async fn write(
    store: &FileStore,
    image_data: &str,
    identity_key: &str,
) -> Result<PhotoReference, StoreError> {
    let raw = photo::decode(image_data)?;

    fs::create_dir_all(&store.directory)
        .await
        .map_err(write_error(&store.directory))?;

    let mut attempt = 1;

    let (path, mut file) = loop {
        let file_name = photo::file_name(identity_key, OffsetDateTime::now_utc())?;
        let path = store.directory.join(file_name);

        let result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        match result {
            Ok(file) => break (path, file),
            // same key within the same microsecond; the clock will have
            // moved on by the next attempt
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_ATTEMPTS => {
                attempt += 1;
            }
            Err(e) => return Err(write_error(&path)(e)),
        }
    };

    file.write_all(&raw).await.map_err(write_error(&path))?;
    file.sync_all().await.map_err(write_error(&path))?;

    Ok(PhotoReference::new(path))
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.display().to_string();
    move |source| StoreError::Write { path, source }
}
