//! Backing-store fallback used on cache misses

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Loads a value from the backing store
///
/// `Ok(None)` means the record is confirmed absent; errors are infrastructure
/// failures and are never cached.
#[async_trait]
pub trait Loader<ID, V>: Send + Sync
where
    ID: Send + Sync,
    V: Send,
{
    async fn load(&self, id: &ID) -> Result<Option<V>, DomainError>;
}

#[async_trait]
impl<ID, V, L> Loader<ID, V> for Arc<L>
where
    ID: Send + Sync,
    V: Send,
    L: Loader<ID, V> + ?Sized,
{
    async fn load(&self, id: &ID) -> Result<Option<V>, DomainError> {
        (**self).load(id).await
    }
}

/// Adapts an async closure `Fn(ID) -> Future<Output = Result<Option<V>, _>>` into a `Loader`
pub struct FnLoader<F> {
    f: F,
}

impl<F> FnLoader<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<ID, V, F, Fut> Loader<ID, V> for FnLoader<F>
where
    ID: Clone + Send + Sync,
    V: Send,
    F: Fn(ID) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<V>, DomainError>> + Send,
{
    async fn load(&self, id: &ID) -> Result<Option<V>, DomainError> {
        (self.f)(id.clone()).await
    }
}

/// Shorthand for `FnLoader::new`
pub fn loader_fn<F>(f: F) -> FnLoader<F> {
    FnLoader::new(f)
}
