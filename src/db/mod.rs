//! Database module for the Movie Catalog API
//!
//! Provides the MongoDB connection handle, index setup, health checks and the
//! store traits the pipelines depend on. The concrete MongoDB implementations
//! of those traits live in [`repository`].

pub mod repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, IndexModel};
use thiserror::Error;
use tracing::info;

use crate::auth::PlainPassword;
use crate::models::{Movie, MoviePatch, NewUser, User};

/// Collection holding movie documents
pub const MOVIES_COLLECTION: &str = "movies";

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// Persistence store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("Malformed id `{0}`")]
    InvalidId(String),

    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Parse a hex id into an `ObjectId`
pub fn parse_object_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Fresh hex id for a document about to be inserted
pub fn new_object_id() -> String {
    ObjectId::new().to_hex()
}

/// Movie persistence
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Every movie in the collection
    async fn all_movies(&self) -> StoreResult<Vec<Movie>>;

    /// Movies whose `addedBy` is `owner_id`
    async fn movies_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Movie>>;

    async fn find_movie(&self, id: &str) -> StoreResult<Option<Movie>>;

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()>;

    /// `$set` the supplied fields and `updatedAt`, returning the updated document
    async fn update_movie(
        &self,
        id: &str,
        patch: MoviePatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Movie>>;

    /// Returns whether a document was removed
    async fn delete_movie(&self, id: &str) -> StoreResult<bool>;

    /// Ids of movies without an `addedBy` reference
    async fn orphan_movie_ids(&self) -> StoreResult<Vec<String>>;

    async fn set_owner(&self, movie_id: &str, owner_id: &str) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()>;
}

/// User persistence
///
/// Implementations hash [`PlainPassword`] values right before they are
/// written; nothing else in the crate ever produces a stored hash.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Ids of every user, used by the owner backfill
    async fn user_ids(&self) -> StoreResult<Vec<String>>;

    async fn set_password(&self, id: &str, password: PlainPassword) -> StoreResult<bool>;

    async fn set_profile_photo(&self, id: &str, url: &str) -> StoreResult<Option<User>>;

    async fn delete_user(&self, id: &str) -> StoreResult<bool>;
}

/// MongoDB database handle
#[derive(Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB
    ///
    /// # Arguments
    /// * `uri` - MongoDB connection string
    /// * `database_name` - Database holding the catalog collections
    pub async fn new(uri: &str, database_name: &str) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("movie-catalog".to_string());

        let client = Client::with_options(options)?;
        let db = client.database(database_name);

        Ok(Self { db })
    }

    /// Get a reference to the underlying database
    pub fn inner(&self) -> &mongodb::Database {
        &self.db
    }

    /// Create the indexes the catalog relies on
    ///
    /// Creating an index that already exists is a no-op, so this runs on every start.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let movies = self.db.collection::<Movie>(MOVIES_COLLECTION);
        movies
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "imdbID": 1 })
                        .options(
                            IndexOptions::builder()
                                .unique(true)
                                .sparse(true)
                                .build(),
                        )
                        .build(),
                    IndexModel::builder().keys(doc! { "addedBy": 1 }).build(),
                ],
                None,
            )
            .await?;

        let users = self.db.collection::<User>(USERS_COLLECTION);
        let unique = || IndexOptions::builder().unique(true).build();
        users
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "username": 1 })
                        .options(unique())
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "email": 1 })
                        .options(unique())
                        .build(),
                ],
                None,
            )
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }

    /// Check database health with a `ping` command
    pub async fn health_check(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
