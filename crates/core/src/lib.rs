pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod recommendations;
pub mod session;
pub mod storage;

pub use catalog::{Catalog, StaticCatalog};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, StorageBackend};
pub use domain::history::{
    AppliedFilters, Breadcrumb, HistorySnapshot, RecentPageEntry, SearchSnapshot, UiFlags,
};
pub use domain::product::{ProductId, ProductRef};
pub use errors::{ApplicationError, CatalogError, StorageError};
pub use history::{
    Clock, HistoryEvent, HistoryLimits, HistoryStore, LoadOutcome, ManualClock, SubscriptionId,
    SystemClock,
};
pub use recommendations::{
    CandidateAggregator, CandidateSource, RecommendationSettings, RelatedProduct, ReportBuilder,
    ScoreEngine, ScoredProduct, SessionReport,
};
pub use session::SessionRegistry;
pub use storage::{BlobStore, MemoryBlobStore};
