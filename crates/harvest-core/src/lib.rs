pub mod analysis;
pub mod config;
pub mod download;
pub mod error;
pub mod extraction;
pub mod frontier;
pub mod manifest;
pub mod models;
pub mod pagination;
pub mod record;
pub mod retry;
pub mod throttle;
pub mod traits;
pub mod transform;
pub mod util;
pub mod validate;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::HarvestConfig;
pub use error::{AppError, ExtractionFailure, ValidationRejection};
pub use models::{FrontierState, RawJobStub, ValidatedJob, compute_hash};
pub use record::NormalizedJobRecord;
pub use traits::{
    Fetcher, FrontierStore, ListingParser, NextPage, NextPageCheck, PageNavigator,
    RecordExtractor, RenderedPage,
};
