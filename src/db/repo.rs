use async_trait::async_trait;

use super::model::*;
use super::query::MovieQuery;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_user(&self, username: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: &str) -> DbResult<User>;
    async fn insert_user(&self, user: &User) -> DbResult<()>;
}

#[async_trait]
pub trait AccessTokenRepo: Send + Sync {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken>;
    async fn insert_token(&self, token: &AccessToken) -> DbResult<()>;
    async fn delete_token(&self, token: &str) -> DbResult<()>;
}

#[async_trait]
pub trait GenreRepo: Send + Sync {
    async fn list_genres(&self) -> DbResult<Vec<Genre>>;
    /// Returns the genres that exist among `ids`, in the order of `ids`.
    async fn get_genres(&self, ids: &[String]) -> DbResult<Vec<Genre>>;
    async fn insert_genre(&self, genre: &Genre) -> DbResult<()>;
}

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn find_movies(&self, query: &MovieQuery, limit: u64, offset: u64)
        -> DbResult<Vec<Movie>>;
    async fn count_movies(&self, query: &MovieQuery) -> DbResult<u64>;
    async fn get_movie(&self, id: &str) -> DbResult<Movie>;
    async fn insert_movie(&self, movie: &Movie) -> DbResult<()>;
    /// Replaces the writable fields of `id`, inserting a fresh record
    /// with zero counters when there is none. Returns the stored record.
    async fn upsert_movie(&self, id: &str, fields: &MovieFields) -> DbResult<Movie>;
    /// Returns the number of records removed.
    async fn delete_movie(&self, id: &str) -> DbResult<u64>;
    /// Adds one to the visit counter. Returns false if there is no such movie.
    async fn increment_visits(&self, id: &str) -> DbResult<bool>;
    async fn set_reaction_counts(&self, id: &str, likes: i64, dislikes: i64) -> DbResult<bool>;
    async fn find_movies_by_genres(&self, genres: &[String]) -> DbResult<Vec<Movie>>;
    async fn top_rated(&self, limit: u64) -> DbResult<Vec<Movie>>;
}

#[async_trait]
pub trait WatchListRepo: Send + Sync {
    async fn add_to_watch_list(&self, entry: &WatchListEntry) -> DbResult<()>;
    /// Returns the number of entries removed.
    async fn remove_from_watch_list(&self, entry: &WatchListEntry) -> DbResult<u64>;
    async fn get_watch_list(&self, user_id: &str) -> DbResult<Vec<Movie>>;
}

#[async_trait]
pub trait ReactionRepo: Send + Sync {
    async fn find_reaction(&self, user_id: &str, movie_id: &str)
        -> DbResult<Option<MovieReaction>>;
    async fn insert_reaction(&self, reaction: &MovieReaction) -> DbResult<()>;
    async fn delete_reaction(&self, id: &str) -> DbResult<u64>;
    async fn count_reactions(&self, movie_id: &str, kind: ReactionKind) -> DbResult<u64>;
}

#[async_trait]
pub trait Repository:
    UserRepo + AccessTokenRepo + GenreRepo + MovieRepo + WatchListRepo + ReactionRepo + Send + Sync
{
    /// Releases the store's connections. Called once on shutdown.
    async fn close(&self);
}
