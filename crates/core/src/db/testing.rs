//! In-memory store helpers for tests

use crate::config::DatabaseConfig;
use crate::db::models::Feature;
use crate::db::{schema, DbPool, Repository};

/// A repository over a fresh in-memory SQLite database with the schema in place
pub(crate) async fn repository() -> Repository {
    let pool = DbPool::new(&DatabaseConfig::default())
        .await
        .expect("in-memory database");
    schema::bootstrap(pool.write())
        .await
        .expect("schema bootstrap");
    Repository::new(pool)
}

/// Create a gazetteer with one source holding the given identifiers
pub(crate) async fn seed_features(
    repo: &Repository,
    gazetteer_name: &str,
    identifiers: &[&str],
) -> Vec<Feature> {
    let gazetteer = repo.create_gazetteer(gazetteer_name).await.unwrap();
    let source = repo
        .create_source(gazetteer.id, "allCountries", "geonameid")
        .await
        .unwrap();

    let mut features = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        features.push(
            repo.create_feature(source.id, gazetteer_name, "geonameid", identifier)
                .await
                .unwrap(),
        );
    }
    features
}
