//! Geoparse Core Library
//!
//! Provenance-tracked toponym annotation pipeline:
//! - Corpus, registry and provenance entities with a repository over SeaORM
//! - Recognizer/resolver capability traits and manual implementations
//! - Idempotent recognition and resolution services
//! - Context-scoped document views
//! - Project and one-shot geoparsing facades
//! - Configuration, errors, metrics and tracing bootstrap

pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod geoparser;
pub mod metrics;
pub mod modules;
pub mod observability;
pub mod project;
pub mod services;

// Re-export commonly used types
pub use config::{AppConfig, PipelineSettings, ResolutionMarking};
pub use context::{ContextScope, DocumentView, ReferenceView, ReferentView};
pub use db::{DbPool, FeatureLookup, Repository};
pub use errors::{AppError, Result};
pub use geoparser::Geoparser;
pub use modules::{FeatureKey, FitOptions, ManualRecognizer, ManualResolver, Recognizer, Resolver, Span};
pub use project::{Project, TextBatch};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
