//! Remote data source abstraction.
//!
//! This module defines the [`TrendSource`] trait the scheduler polls, the
//! typed item model ([`PlatformItem`]) and the endpoint wire shapes.  The
//! real implementation is [`HttpSource`]; tests drive the scheduler with
//! in-memory sources instead.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `fixture.rs`).
//! 2. Define a struct and implement [`TrendSource`] for it.
//! 3. Add `mod fixture;` below and re-export your struct.
//! 4. Construct it in `main.rs` instead of [`HttpSource`].
//!
//! The scheduler, normaliser and UI never look past the trait.

mod http;
mod item;
mod payload;

pub use http::HttpSource;
pub use item::{Bucket, Platform, PlatformDetails, PlatformItem};
pub use payload::{Health, PlatformStatus, ServiceStatus, TrendingPayload};

use std::future::Future;

use crate::error::FetchError;

/// Something that can answer the two requests of a refresh cycle.
///
/// Both methods are called concurrently once per cycle from the scheduler
/// task, so the returned futures must be [`Send`].
///
/// ```ignore
/// struct Canned(TrendingPayload);
///
/// impl TrendSource for Canned {
///     async fn fetch_status(&self) -> Result<ServiceStatus, FetchError> {
///         Ok(ServiceStatus::default())
///     }
///     async fn fetch_trending(&self) -> Result<TrendingPayload, FetchError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait TrendSource: Send + Sync + 'static {
    /// Fetch the service status document.
    fn fetch_status(&self) -> impl Future<Output = Result<ServiceStatus, FetchError>> + Send;

    /// Fetch the raw trending payload.
    fn fetch_trending(&self) -> impl Future<Output = Result<TrendingPayload, FetchError>> + Send;
}
