//! Blob storage collaborator.
//!
//! Bucket upload/delete/public-URL helpers scoped to a declared allow-list.
//! Operations on disallowed buckets are rejected through the diagnostics
//! channel and a failure return, never an error across the boundary.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};
use tether_core::prelude::{Diagnostics, ExecutorError};

///
/// BlobStore
///

pub trait BlobStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ExecutorError>;
    fn remove(&self, bucket: &str, path: &str) -> Result<(), ExecutorError>;
    fn public_url(&self, bucket: &str, path: &str) -> Result<String, ExecutorError>;
}

///
/// ScopedStore
///
/// Allow-list wrapper around a blob store.
///

pub struct ScopedStore {
    inner: Rc<dyn BlobStore>,
    allowed: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl ScopedStore {
    #[must_use]
    pub fn new<I>(inner: Rc<dyn BlobStore>, allowed: I, diagnostics: Diagnostics) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            inner,
            allowed: allowed.into_iter().map(Into::into).collect(),
            diagnostics,
        }
    }

    pub fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> bool {
        if !self.check(bucket) {
            return false;
        }

        match self.inner.upload(bucket, path, bytes) {
            Ok(()) => true,
            Err(err) => {
                self.diagnostics
                    .error(format!("upload to '{bucket}/{path}' failed: {err}"));

                false
            }
        }
    }

    pub fn remove(&self, bucket: &str, path: &str) -> bool {
        if !self.check(bucket) {
            return false;
        }

        match self.inner.remove(bucket, path) {
            Ok(()) => true,
            Err(err) => {
                self.diagnostics
                    .error(format!("delete of '{bucket}/{path}' failed: {err}"));

                false
            }
        }
    }

    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> Option<String> {
        if !self.check(bucket) {
            return None;
        }

        match self.inner.public_url(bucket, path) {
            Ok(url) => Some(url),
            Err(err) => {
                self.diagnostics
                    .error(format!("public url for '{bucket}/{path}' failed: {err}"));

                None
            }
        }
    }

    fn check(&self, bucket: &str) -> bool {
        if self.allowed.contains(bucket) {
            return true;
        }

        self.diagnostics
            .warn(format!("bucket '{bucket}' is not on the allow-list"));

        false
    }
}

///
/// MemoryBlobStore
///
/// Reference store for tests and fixtures.
///

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RefCell<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .borrow()
            .contains_key(&(bucket.to_string(), path.to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), ExecutorError> {
        self.objects
            .borrow_mut()
            .insert((bucket.to_string(), path.to_string()), bytes.to_vec());

        Ok(())
    }

    fn remove(&self, bucket: &str, path: &str) -> Result<(), ExecutorError> {
        self.objects
            .borrow_mut()
            .remove(&(bucket.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| ExecutorError::new(format!("object '{bucket}/{path}' not found")))
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String, ExecutorError> {
        if self.contains(bucket, path) {
            Ok(format!("memory://{bucket}/{path}"))
        } else {
            Err(ExecutorError::new(format!(
                "object '{bucket}/{path}' not found"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::prelude::Severity;

    #[test]
    fn allow_list_gates_every_operation() {
        let (diagnostics, sink) = Diagnostics::capture();
        let store = MemoryBlobStore::new();
        let scoped = ScopedStore::new(store.clone(), ["avatars"], diagnostics);

        assert!(scoped.upload("avatars", "a.png", b"bytes"));
        assert!(store.contains("avatars", "a.png"));
        assert_eq!(
            scoped.public_url("avatars", "a.png").as_deref(),
            Some("memory://avatars/a.png")
        );

        assert!(!scoped.upload("secrets", "a.png", b"bytes"));
        assert!(scoped.public_url("secrets", "a.png").is_none());
        assert!(!scoped.remove("secrets", "a.png"));
        assert_eq!(sink.count(Severity::Warning), 3);
    }

    #[test]
    fn inner_store_failure_reports_via_error_channel() {
        let (diagnostics, sink) = Diagnostics::capture();
        let scoped = ScopedStore::new(MemoryBlobStore::new(), ["avatars"], diagnostics);

        assert!(!scoped.remove("avatars", "missing.png"));
        assert_eq!(sink.count(Severity::Error), 1);
    }
}
