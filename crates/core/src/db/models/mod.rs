//! SeaORM entity models
//!
//! Corpus, registry, provenance and gazetteer tables

mod document;
mod feature;
mod gazetteer;
mod project;
mod recognition;
mod recognizer;
mod reference;
mod referent;
mod resolution;
mod resolver;
mod source;

pub use project::{
    Entity as ProjectEntity,
    Model as Project,
    ActiveModel as ProjectActiveModel,
    Column as ProjectColumn,
};

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use recognizer::{
    Entity as RecognizerEntity,
    Model as RecognizerRecord,
    ActiveModel as RecognizerActiveModel,
    Column as RecognizerColumn,
};

pub use resolver::{
    Entity as ResolverEntity,
    Model as ResolverRecord,
    ActiveModel as ResolverActiveModel,
    Column as ResolverColumn,
};

pub use reference::{
    Entity as ReferenceEntity,
    Model as Reference,
    ActiveModel as ReferenceActiveModel,
    Column as ReferenceColumn,
};

pub use referent::{
    Entity as ReferentEntity,
    Model as Referent,
    ActiveModel as ReferentActiveModel,
    Column as ReferentColumn,
};

pub use recognition::{
    Entity as RecognitionEntity,
    Model as Recognition,
    ActiveModel as RecognitionActiveModel,
    Column as RecognitionColumn,
};

pub use resolution::{
    Entity as ResolutionEntity,
    Model as Resolution,
    ActiveModel as ResolutionActiveModel,
    Column as ResolutionColumn,
};

pub use gazetteer::{
    Entity as GazetteerEntity,
    Model as Gazetteer,
    ActiveModel as GazetteerActiveModel,
    Column as GazetteerColumn,
};

pub use source::{
    Entity as SourceEntity,
    Model as Source,
    ActiveModel as SourceActiveModel,
    Column as SourceColumn,
};

pub use feature::{
    Entity as FeatureEntity,
    Model as Feature,
    ActiveModel as FeatureActiveModel,
    Column as FeatureColumn,
};
