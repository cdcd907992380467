use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::*;
use super::query::{matches, MovieQuery};
use super::repo::*;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tokens: HashMap<String, AccessToken>,
    genres: Vec<Genre>,
    movies: Vec<Movie>,
    watchlist: Vec<WatchListEntry>,
    reactions: Vec<MovieReaction>,
}

/// Repository that keeps every table in process memory. Records keep
/// insertion order, which stands in for the store's natural order.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", username)))
    }

    async fn get_user_by_id(&self, id: &str) -> DbResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", id)))
    }

    async fn insert_user(&self, user: &User) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(DbError::AlreadyExists(format!(
                "User already exists: {}",
                user.username
            )));
        }
        tables.users.push(user.clone());
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepo for MemoryRepository {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken> {
        let tables = self.tables.read().await;
        tables
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| DbError::NotFound("Token not found".to_string()))
    }

    async fn insert_token(&self, token: &AccessToken) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, token: &str) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.tokens.remove(token);
        Ok(())
    }
}

#[async_trait]
impl GenreRepo for MemoryRepository {
    async fn list_genres(&self) -> DbResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        let mut genres = tables.genres.clone();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn get_genres(&self, ids: &[String]) -> DbResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.genres.iter().find(|g| &g.id == id).cloned())
            .collect())
    }

    async fn insert_genre(&self, genre: &Genre) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.genres.push(genre.clone());
        Ok(())
    }
}

#[async_trait]
impl MovieRepo for MemoryRepository {
    async fn find_movies(
        &self,
        query: &MovieQuery,
        limit: u64,
        offset: u64,
    ) -> DbResult<Vec<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .iter()
            .filter(|m| matches(query, m))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_movies(&self, query: &MovieQuery) -> DbResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .iter()
            .filter(|m| matches(query, m))
            .count() as u64)
    }

    async fn get_movie(&self, id: &str) -> DbResult<Movie> {
        let tables = self.tables.read().await;
        tables
            .movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Movie not found: {}", id)))
    }

    async fn insert_movie(&self, movie: &Movie) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.movies.iter().any(|m| m.id == movie.id) {
            return Err(DbError::AlreadyExists(format!(
                "Movie already exists: {}",
                movie.id
            )));
        }
        tables.movies.push(movie.clone());
        Ok(())
    }

    async fn upsert_movie(&self, id: &str, fields: &MovieFields) -> DbResult<Movie> {
        let mut tables = self.tables.write().await;
        if let Some(movie) = tables.movies.iter_mut().find(|m| m.id == id) {
            movie.apply(fields.clone());
            return Ok(movie.clone());
        }
        let movie = Movie::new(id.to_string(), fields.clone());
        tables.movies.push(movie.clone());
        Ok(movie)
    }

    async fn delete_movie(&self, id: &str) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.movies.len();
        tables.movies.retain(|m| m.id != id);
        Ok((before - tables.movies.len()) as u64)
    }

    async fn increment_visits(&self, id: &str) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.movies.iter_mut().find(|m| m.id == id) {
            Some(movie) => {
                movie.visits += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_reaction_counts(&self, id: &str, likes: i64, dislikes: i64) -> DbResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.movies.iter_mut().find(|m| m.id == id) {
            Some(movie) => {
                movie.likes = likes;
                movie.dislikes = dislikes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_movies_by_genres(&self, genres: &[String]) -> DbResult<Vec<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables
            .movies
            .iter()
            .filter(|m| m.genres.iter().any(|g| genres.contains(g)))
            .cloned()
            .collect())
    }

    async fn top_rated(&self, limit: u64) -> DbResult<Vec<Movie>> {
        let tables = self.tables.read().await;
        let mut movies = tables.movies.clone();
        // Stable sort, so ties keep insertion order.
        movies.sort_by(|a, b| b.likes.cmp(&a.likes));
        movies.truncate(limit as usize);
        Ok(movies)
    }
}

#[async_trait]
impl WatchListRepo for MemoryRepository {
    async fn add_to_watch_list(&self, entry: &WatchListEntry) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.watchlist.contains(entry) {
            tables.watchlist.push(entry.clone());
        }
        Ok(())
    }

    async fn remove_from_watch_list(&self, entry: &WatchListEntry) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.watchlist.len();
        tables.watchlist.retain(|e| e != entry);
        Ok((before - tables.watchlist.len()) as u64)
    }

    async fn get_watch_list(&self, user_id: &str) -> DbResult<Vec<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables
            .watchlist
            .iter()
            .filter(|e| e.userid == user_id)
            .filter_map(|e| tables.movies.iter().find(|m| m.id == e.movieid).cloned())
            .collect())
    }
}

#[async_trait]
impl ReactionRepo for MemoryRepository {
    async fn find_reaction(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> DbResult<Option<MovieReaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reactions
            .iter()
            .find(|r| r.userid == user_id && r.movieid == movie_id)
            .cloned())
    }

    async fn insert_reaction(&self, reaction: &MovieReaction) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        tables.reactions.push(reaction.clone());
        Ok(())
    }

    async fn delete_reaction(&self, id: &str) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.reactions.len();
        tables.reactions.retain(|r| r.id != id);
        Ok((before - tables.reactions.len()) as u64)
    }

    async fn count_reactions(&self, movie_id: &str, kind: ReactionKind) -> DbResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reactions
            .iter()
            .filter(|r| r.movieid == movie_id && r.kind == kind)
            .count() as u64)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn close(&self) {}
}
