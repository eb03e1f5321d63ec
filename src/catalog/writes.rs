//! Movie write pipeline: create, update, delete and owner backfill

use chrono::Utc;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::{info, warn};

use super::listing::MOVIES_CACHE_KEY;
use super::normalize::normalize_movie;
use crate::auth::Auth;
use crate::cache::CacheStore;
use crate::db::{new_object_id, MovieStore, UserStore};
use crate::email::{DeletionNotice, Notifier};
use crate::error::{AppError, AppResult};
use crate::models::Movie;

const MOVIE_NOT_FOUND: &str = "Movie not found";

/// Collaborators of the write pipeline for one request
pub struct MovieWriter<'a> {
    pub movies: &'a dyn MovieStore,
    pub users: &'a dyn UserStore,
    pub cache: &'a dyn CacheStore,
    /// `None` when no mail transport is configured
    pub notifier: Option<&'a dyn Notifier>,
    /// Drop the cached listing snapshot after each successful write
    pub invalidate_on_write: bool,
}

impl MovieWriter<'_> {
    /// Normalize `payload` and store it as a new movie owned by `owner_id`
    pub async fn create(&self, payload: &Value, owner_id: &str) -> AppResult<Movie> {
        let movie = normalize_movie(payload)?.into_movie(
            new_object_id(),
            owner_id.to_string(),
            Utc::now(),
        );

        self.movies.insert_movie(&movie).await?;
        info!("Movie {} ({}) added by {}", movie.id, movie.title, owner_id);

        self.after_write().await;
        Ok(movie)
    }

    /// Apply the fields present in `payload` to movie `id`
    ///
    /// The id and owner are not part of the normalized field set, so they
    /// cannot be changed here.
    pub async fn update(&self, id: &str, payload: &Value) -> AppResult<Movie> {
        let patch = normalize_movie(payload)?;

        let movie = self
            .movies
            .update_movie(id, patch, Utc::now())
            .await?
            .ok_or_else(|| AppError::not_found(MOVIE_NOT_FOUND))?;
        info!("Movie {} updated", id);

        self.after_write().await;
        Ok(movie)
    }

    /// Delete movie `id` and tell its owner
    ///
    /// The notification is best effort: a missing owner or a failed send is
    /// logged and the delete still succeeds.
    pub async fn delete(&self, id: &str, admin: &Auth) -> AppResult<()> {
        let movie = self
            .movies
            .find_movie(id)
            .await?
            .ok_or_else(|| AppError::not_found(MOVIE_NOT_FOUND))?;

        if !self.movies.delete_movie(id).await? {
            return Err(AppError::not_found(MOVIE_NOT_FOUND));
        }
        info!("Movie {} ({}) deleted by admin {}", id, movie.title, admin.username);

        self.notify_owner(&movie, admin).await;
        self.after_write().await;
        Ok(())
    }

    /// Give every movie without an owner a random existing user
    ///
    /// Returns how many movies were updated.
    pub async fn backfill_owners(&self) -> AppResult<u64> {
        let user_ids = self.users.user_ids().await?;
        if user_ids.is_empty() {
            return Err(AppError::validation("No users found."));
        }

        let orphans = self.movies.orphan_movie_ids().await?;
        let assignments: Vec<(String, String)> = {
            let mut rng = rand::thread_rng();
            orphans
                .into_iter()
                .filter_map(|movie_id| {
                    user_ids
                        .choose(&mut rng)
                        .map(|owner| (movie_id, owner.clone()))
                })
                .collect()
        };

        let mut updated = 0;
        for (movie_id, owner_id) in &assignments {
            if self.movies.set_owner(movie_id, owner_id).await? {
                updated += 1;
            }
        }
        info!("Assigned owners to {} movies", updated);

        if updated > 0 {
            self.after_write().await;
        }
        Ok(updated)
    }

    async fn notify_owner(&self, movie: &Movie, admin: &Auth) {
        let Some(notifier) = self.notifier else {
            return;
        };
        let Some(owner_id) = movie.added_by.as_deref() else {
            return;
        };

        let owner = match self.users.find_user_by_id(owner_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                warn!("Owner {} of deleted movie {} no longer exists", owner_id, movie.id);
                return;
            }
            Err(e) => {
                warn!("Could not look up owner {} of deleted movie: {}", owner_id, e);
                return;
            }
        };

        let notice = DeletionNotice {
            to: owner.email,
            movie_title: movie.title.clone(),
            admin_name: admin.username.clone(),
            admin_email: admin.email.clone(),
        };
        if let Err(e) = notifier.movie_deleted(&notice).await {
            warn!("Failed to send deletion notice to {}: {}", notice.to, e);
        }
    }

    async fn after_write(&self) {
        if !self.invalidate_on_write {
            return;
        }
        if let Err(e) = self.cache.delete(MOVIES_CACHE_KEY).await {
            warn!("Failed to invalidate movie snapshot: {}", e);
        }
    }
}
