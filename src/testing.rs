//! In-memory stand-ins for MongoDB, Redis and SMTP used by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::PlainPassword;
use crate::cache::{CacheError, CacheResult, CacheStore, WindowCount};
use crate::db::repository::hash_for_storage;
use crate::db::{
    new_object_id, parse_object_id, MovieStore, StoreError, StoreResult, UserStore,
};
use crate::email::{DeletionNotice, EmailError, Notifier};
use crate::models::{Movie, MoviePatch, NewUser, Role, User};

fn unavailable() -> StoreError {
    StoreError::Unavailable("memory store switched off".to_string())
}

/// Movie store backed by a vector
#[derive(Default)]
pub struct MemoryMovieStore {
    movies: Mutex<Vec<Movie>>,
    full_fetches: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryMovieStore {
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        Self {
            movies: Mutex::new(movies),
            ..Self::default()
        }
    }

    /// Number of `all_movies` calls served so far
    pub fn full_fetches(&self) -> usize {
        self.full_fetches.load(Ordering::SeqCst)
    }

    /// Make every call fail until switched back
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn all_movies(&self) -> StoreResult<Vec<Movie>> {
        self.check()?;
        self.full_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.movies.lock().unwrap().clone())
    }

    async fn movies_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Movie>> {
        self.check()?;
        parse_object_id(owner_id)?;
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.added_by.as_deref() == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn find_movie(&self, id: &str) -> StoreResult<Option<Movie>> {
        self.check()?;
        parse_object_id(id)?;
        Ok(self.movies.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<()> {
        self.check()?;
        let mut movies = self.movies.lock().unwrap();
        if let Some(imdb_id) = movie.imdb_id.as_deref() {
            if movies.iter().any(|m| m.imdb_id.as_deref() == Some(imdb_id)) {
                return Err(StoreError::Duplicate("imdbID".to_string()));
            }
        }
        movies.push(movie.clone());
        Ok(())
    }

    async fn update_movie(
        &self,
        id: &str,
        patch: MoviePatch,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Movie>> {
        self.check()?;
        parse_object_id(id)?;
        let mut movies = self.movies.lock().unwrap();
        Ok(movies.iter_mut().find(|m| m.id == id).map(|movie| {
            patch.apply_to(movie);
            movie.updated_at = Some(updated_at);
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: &str) -> StoreResult<bool> {
        self.check()?;
        parse_object_id(id)?;
        let mut movies = self.movies.lock().unwrap();
        let before = movies.len();
        movies.retain(|m| m.id != id);
        Ok(movies.len() < before)
    }

    async fn orphan_movie_ids(&self) -> StoreResult<Vec<String>> {
        self.check()?;
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.added_by.is_none())
            .map(|m| m.id.clone())
            .collect())
    }

    async fn set_owner(&self, movie_id: &str, owner_id: &str) -> StoreResult<bool> {
        self.check()?;
        parse_object_id(owner_id)?;
        let mut movies = self.movies.lock().unwrap();
        match movies.iter_mut().find(|m| m.id == movie_id) {
            Some(movie) => {
                movie.added_by = Some(owner_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check()
    }
}

/// User store backed by a vector; passwords are bcrypt hashed like the real one
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    failing: AtomicBool,
}

impl MemoryUserStore {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Promote an existing user to admin
    pub fn make_admin(&self, id: &str) {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            user.role = Role::Admin;
        }
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.check()?;
        let hash = hash_for_storage(&user.password)?;

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: new_object_id(),
            username: user.username,
            email: user.email,
            password: hash,
            role: Role::User,
            profile_photo: String::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.check()?;
        parse_object_id(id)?;
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn user_ids(&self) -> StoreResult<Vec<String>> {
        self.check()?;
        Ok(self.users.lock().unwrap().iter().map(|u| u.id.clone()).collect())
    }

    async fn set_password(&self, id: &str, password: PlainPassword) -> StoreResult<bool> {
        self.check()?;
        parse_object_id(id)?;
        let hash = hash_for_storage(&password)?;
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password = hash;
                user.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_profile_photo(&self, id: &str, url: &str) -> StoreResult<Option<User>> {
        self.check()?;
        parse_object_id(id)?;
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            user.profile_photo = url.to_string();
            user.updated_at = Some(Utc::now());
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        self.check()?;
        parse_object_id(id)?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}

/// Expiring key/value map with the same semantics as the Redis cache
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    failing: AtomicBool,
}

impl MemoryCache {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("memory cache switched off".to_string()))
        } else {
            Ok(())
        }
    }

    fn live(&self, key: &str) -> Option<(String, Instant)> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get(key).cloned()?;
        if entry.1 <= Instant::now() {
            entries.remove(key);
            return None;
        }
        Some(entry)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        Ok(self.live(key).map(|(value, _)| value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> CacheResult<WindowCount> {
        self.check()?;
        let now = Instant::now();
        let (count, expires_at) = match self.live(key) {
            Some((value, expires_at)) => (value.parse::<u64>().unwrap_or(0) + 1, expires_at),
            None => (1, now + window),
        };
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (count.to_string(), expires_at));

        Ok(WindowCount {
            count,
            resets_in: expires_at.saturating_duration_since(now),
        })
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check()
    }
}

/// Notifier that records what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<DeletionNotice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<DeletionNotice> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn movie_deleted(&self, notice: &DeletionNotice) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::SmtpError("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}
