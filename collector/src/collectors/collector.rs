use eyre::Result;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

pub type CollectFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// One unit of periodic work that refreshes some metrics.
///
/// Implementations must tolerate being dropped mid-collection: that is how
/// shutdown interrupts an in-flight run.
pub trait Collector: Send + Sync {
    fn collect(&self) -> CollectFuture<'_>;

    /// Get the name of this collector
    fn name(&self) -> &str;
}

impl<C: Collector + ?Sized> Collector for Arc<C> {
    fn collect(&self) -> CollectFuture<'_> {
        (**self).collect()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
