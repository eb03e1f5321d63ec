//! Repository module for movie and user persistence
//!
//! Implements [`MovieStore`] and [`UserStore`] on top of MongoDB. Models carry
//! ids and timestamps as plain strings and chrono values so they serialize
//! cleanly to JSON; every write converts them back to native BSON types
//! (`ObjectId`, `DateTime`) before the document reaches the server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Collection;
use tracing::warn;

use super::{
    parse_object_id, Database, MovieStore, StoreError, StoreResult, UserStore, MOVIES_COLLECTION,
    USERS_COLLECTION,
};
use crate::auth::PlainPassword;
use crate::models::{Movie, MoviePatch, NewUser, Role, User};

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

fn bson_datetime(timestamp: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(timestamp)
}

/// Map a duplicate key failure to [`StoreError::Duplicate`] naming the field
///
/// `fields` are checked against the server message in order; the first one
/// mentioned wins.
fn classify(err: mongodb::error::Error, fields: &[&str]) -> StoreError {
    let message = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.clone())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(e.message.clone()),
        _ => None,
    };

    match message {
        Some(message) => {
            let field = fields
                .iter()
                .find(|field| message.contains(*field))
                .or_else(|| fields.first())
                .copied()
                .unwrap_or("value");
            StoreError::Duplicate(field.to_string())
        }
        None => StoreError::Mongo(err),
    }
}

/// Encode a movie for insertion with native BSON ids and timestamps
fn movie_document(movie: &Movie) -> StoreResult<Document> {
    let mut document = bson::to_document(movie)?;

    document.insert("_id", parse_object_id(&movie.id)?);
    match &movie.added_by {
        Some(owner) => document.insert("addedBy", parse_object_id(owner)?),
        None => document.insert("addedBy", Bson::Null),
    };
    // The sparse unique index only skips documents without the field; null would collide
    if movie.imdb_id.is_none() {
        document.remove("imdbID");
    }
    if let Some(created_at) = movie.created_at {
        document.insert("createdAt", bson_datetime(created_at));
    }
    if let Some(updated_at) = movie.updated_at {
        document.insert("updatedAt", bson_datetime(updated_at));
    }

    Ok(document)
}

/// Decode raw movie documents, skipping any that no longer fit the model
///
/// Updates bypass validation, so a stored document can hold values the model
/// rejects. Those are logged and left out rather than failing the whole read.
fn decode_movies(documents: Vec<Document>) -> Vec<Movie> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document
                .get_object_id("_id")
                .map(|oid| oid.to_hex())
                .unwrap_or_default();
            match bson::from_document::<Movie>(document) {
                Ok(movie) => Some(movie),
                Err(e) => {
                    warn!("Skipping unreadable movie document {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

impl Database {
    fn movies(&self) -> Collection<Movie> {
        self.inner().collection(MOVIES_COLLECTION)
    }

    fn users(&self) -> Collection<User> {
        self.inner().collection(USERS_COLLECTION)
    }

    async fn find_movies(&self, filter: Document) -> StoreResult<Vec<Movie>> {
        let cursor = self
            .inner()
            .collection::<Document>(MOVIES_COLLECTION)
            .find(filter, None)
            .await?;
        Ok(decode_movies(cursor.try_collect().await?))
    }

    /// Hex ids of the documents matching `filter` in `collection`
    async fn ids_matching(&self, collection: &str, filter: Document) -> StoreResult<Vec<String>> {
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let mut cursor = self
            .inner()
            .collection::<Document>(collection)
            .find(filter, options)
            .await?;

        let mut ids = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Ok(oid) = document.get_object_id("_id") {
                ids.push(oid.to_hex());
            }
        }
        Ok(ids)
    }
}

// ============================================================================
// Movies Repository
// ============================================================================

#[async_trait]
impl MovieStore for Database {
    async fn all_movies(&self) -> StoreResult<Vec<Movie>> {
        self.find_movies(doc! {}).await
    }

    async fn movies_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Movie>> {
        let owner = parse_object_id(owner_id)?;
        self.find_movies(doc! { "addedBy": owner }).await
    }

    async fn find_movie(&self, id: &str) -> StoreResult<Option<Movie>> {
        let oid = parse_object_id(id)?;
        Ok(self.movies().find_one(doc! { "_id": oid }, None).await?)
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        let document = movie_document(movie)?;
        self.inner()
            .collection::<Document>(MOVIES_COLLECTION)
            .insert_one(document, None)
            .await
            .map_err(|e| classify(e, &["imdbID"]))?;
        Ok(())
    }

    async fn update_movie(
        &self,
        id: &str,
        patch: MoviePatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Movie>> {
        let oid = parse_object_id(id)?;

        let mut set = bson::to_document(&patch)?;
        set.insert("updatedAt", bson_datetime(updated_at));

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.movies()
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set }, options)
            .await
            .map_err(|e| classify(e, &["imdbID"]))
    }

    async fn delete_movie(&self, id: &str) -> StoreResult<bool> {
        let oid = parse_object_id(id)?;
        let result = self.movies().delete_one(doc! { "_id": oid }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn orphan_movie_ids(&self) -> StoreResult<Vec<String>> {
        // `null` matches both a missing field and an explicit null
        self.ids_matching(MOVIES_COLLECTION, doc! { "addedBy": Bson::Null })
            .await
    }

    async fn set_owner(&self, movie_id: &str, owner_id: &str) -> StoreResult<bool> {
        let movie = parse_object_id(movie_id)?;
        let owner = parse_object_id(owner_id)?;

        let result = self
            .movies()
            .update_one(
                doc! { "_id": movie },
                doc! { "$set": { "addedBy": owner, "updatedAt": bson_datetime(Utc::now()) } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.health_check().await
    }
}

// ============================================================================
// Users Repository
// ============================================================================

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let hash = hash_for_storage(&user.password)?;
        let now = Utc::now();
        let oid = bson::oid::ObjectId::new();

        let document = doc! {
            "_id": oid,
            "username": user.username.as_str(),
            "email": user.email.as_str(),
            "password": hash.as_str(),
            "role": "user",
            "profilePhoto": "",
            "createdAt": bson_datetime(now),
            "updatedAt": bson_datetime(now),
        };

        self.inner()
            .collection::<Document>(USERS_COLLECTION)
            .insert_one(document, None)
            .await
            .map_err(|e| classify(e, &["username", "email"]))?;

        Ok(User {
            id: oid.to_hex(),
            username: user.username,
            email: user.email,
            password: hash,
            role: Role::User,
            profile_photo: String::new(),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let oid = parse_object_id(id)?;
        Ok(self.users().find_one(doc! { "_id": oid }, None).await?)
    }

    async fn user_ids(&self) -> StoreResult<Vec<String>> {
        self.ids_matching(USERS_COLLECTION, doc! {}).await
    }

    async fn set_password(&self, id: &str, password: PlainPassword) -> StoreResult<bool> {
        let oid = parse_object_id(id)?;
        let hash = hash_for_storage(&password)?;

        let result = self
            .users()
            .update_one(
                doc! { "_id": oid },
                doc! { "$set": { "password": hash, "updatedAt": bson_datetime(Utc::now()) } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn set_profile_photo(&self, id: &str, url: &str) -> StoreResult<Option<User>> {
        let oid = parse_object_id(id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .users()
            .find_one_and_update(
                doc! { "_id": oid },
                doc! { "$set": { "profilePhoto": url, "updatedAt": bson_datetime(Utc::now()) } },
                options,
            )
            .await?)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let oid = parse_object_id(id)?;
        let result = self.users().delete_one(doc! { "_id": oid }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

/// Hash a plaintext password right before it is persisted
pub(crate) fn hash_for_storage(password: &PlainPassword) -> StoreResult<String> {
    password
        .hash()
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::new_object_id;

    fn sample_movie() -> Movie {
        MoviePatch {
            title: Some("Inception".to_string()),
            imdb_id: Some("tt1375666".to_string()),
            ..MoviePatch::default()
        }
        .into_movie(new_object_id(), new_object_id(), Utc::now())
    }

    #[test]
    fn test_movie_document_uses_native_bson_types() {
        let movie = sample_movie();
        let document = movie_document(&movie).unwrap();

        assert_eq!(
            document.get_object_id("_id").unwrap().to_hex(),
            movie.id
        );
        assert_eq!(
            document.get_object_id("addedBy").unwrap().to_hex(),
            movie.added_by.clone().unwrap()
        );
        assert!(document.get_datetime("createdAt").is_ok());
        assert!(document.get_datetime("updatedAt").is_ok());
        assert_eq!(document.get_str("imdbID").unwrap(), "tt1375666");
    }

    #[test]
    fn test_movie_document_round_trips_through_bson() {
        let movie = sample_movie();
        let document = movie_document(&movie).unwrap();
        let restored: Movie = bson::from_document(document).unwrap();

        assert_eq!(restored.id, movie.id);
        assert_eq!(restored.added_by, movie.added_by);
        assert_eq!(restored.title, "Inception");
        assert_eq!(
            restored.created_at.map(|t| t.timestamp_millis()),
            movie.created_at.map(|t| t.timestamp_millis())
        );
    }

    #[test]
    fn test_decode_movies_skips_unreadable_documents() {
        let good = sample_movie();
        let mut bad = movie_document(&sample_movie()).unwrap();
        bad.insert("type", "documentary");

        let movies = decode_movies(vec![movie_document(&good).unwrap(), bad]);
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, good.id);
    }

    #[test]
    fn test_movie_document_rejects_malformed_owner() {
        let mut movie = sample_movie();
        movie.added_by = Some("nope".to_string());
        assert!(matches!(
            movie_document(&movie),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_hash_for_storage_produces_bcrypt_hash() {
        let hash = hash_for_storage(&PlainPassword::new("correct horse")).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(PlainPassword::new("correct horse").matches(&hash).unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires a running MongoDB
    async fn test_movie_crud_against_live_database() {
        dotenvy::dotenv().ok();
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set for tests");
        let db = Database::new(&uri, "movie-catalog-test").await.unwrap();

        let movie = sample_movie();
        db.insert_movie(&movie).await.unwrap();

        let found = db.find_movie(&movie.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Inception");

        let patch = MoviePatch {
            plot: Some("Dreams within dreams".to_string()),
            ..MoviePatch::default()
        };
        let updated = db
            .update_movie(&movie.id, patch, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.plot.as_deref(), Some("Dreams within dreams"));

        assert!(db.delete_movie(&movie.id).await.unwrap());
        assert!(db.find_movie(&movie.id).await.unwrap().is_none());
    }
}
