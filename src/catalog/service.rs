use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::{
    DbError, Genre, Movie, MovieFields, MovieReaction, ReactionKind, Repository, User,
    WatchListEntry,
};
use crate::util::{generate_id, is_valid_id, QueryParams};

use super::error::{CatalogError, CatalogResult};
use super::query::{listing_params, DEFAULT_LIMIT};

pub const TOP_RATED_LIMIT: u64 = 10;

const NO_MOVIE: &str = "No movie with that id";
const NO_WATCH_LIST_ITEM: &str = "No such watch list item!";
const FIELDS_MISSING: &str = "Title or description missing";
const GENRE_NAME_MISSING: &str = "Genre name missing";

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: String,
    pub username: String,
}

impl From<User> for ActingUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoviePage {
    pub data: Vec<Movie>,
    pub count: u64,
}

/// A movie with its genre references resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub genres: Vec<Genre>,
    pub visits: i64,
    pub likes: i64,
    pub dislikes: i64,
}

impl MovieDetail {
    fn new(movie: Movie, genres: Vec<Genre>) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            image_url: movie.image_url,
            genres,
            visits: movie.visits,
            likes: movie.likes,
            dislikes: movie.dislikes,
        }
    }
}

/// Validates an id and returns it in the lowercase form the stores use,
/// so that `5D8A...` and `5d8a...` name the same record.
fn check_id(id: &str) -> CatalogResult<String> {
    if is_valid_id(id) {
        Ok(id.to_ascii_lowercase())
    } else {
        Err(CatalogError::MalformedId)
    }
}

fn check_fields(fields: &MovieFields) -> CatalogResult<()> {
    if fields.title.is_empty() || fields.description.is_empty() {
        return Err(CatalogError::MissingField(FIELDS_MISSING));
    }
    Ok(())
}

#[derive(Clone)]
pub struct MovieService {
    db: Arc<dyn Repository>,
    page_size: u64,
    top_rated_limit: u64,
}

impl MovieService {
    pub fn new(db: Arc<dyn Repository>) -> Self {
        Self {
            db,
            page_size: DEFAULT_LIMIT,
            top_rated_limit: TOP_RATED_LIMIT,
        }
    }

    pub fn with_limits(mut self, page_size: u64, top_rated_limit: u64) -> Self {
        self.page_size = page_size;
        self.top_rated_limit = top_rated_limit;
        self
    }

    async fn populate(&self, movie: Movie) -> CatalogResult<MovieDetail> {
        let genres = self.db.get_genres(&movie.genres).await?;
        Ok(MovieDetail::new(movie, genres))
    }

    /// One page of movies matching the filters, plus the total match count.
    pub async fn list(&self, params: QueryParams) -> CatalogResult<MoviePage> {
        let (page, query) = listing_params(params, self.page_size)?;
        debug!(limit = page.limit, offset = page.offset, filters = query.len(), "listing movies");

        let data = self.db.find_movies(&query, page.limit, page.offset).await?;
        let count = self.db.count_movies(&query).await?;

        Ok(MoviePage { data, count })
    }

    /// Records a visit and returns the movie with genres resolved.
    pub async fn show(&self, id: &str) -> CatalogResult<MovieDetail> {
        let id = check_id(id)?;

        if !self.db.increment_visits(&id).await? {
            return Err(CatalogError::NotFound(NO_MOVIE));
        }
        let movie = self.db.get_movie(&id).await?;
        self.populate(movie).await
    }

    pub async fn create(&self, fields: MovieFields) -> CatalogResult<MovieDetail> {
        check_fields(&fields)?;

        let movie = Movie::new(generate_id(), fields);
        self.db.insert_movie(&movie).await?;
        info!(id = %movie.id, title = %movie.title, "movie created");

        self.populate(movie).await
    }

    /// Replaces the movie's fields, creating it under `id` if absent.
    pub async fn update(&self, id: &str, fields: MovieFields) -> CatalogResult<MovieDetail> {
        let id = check_id(id)?;
        check_fields(&fields)?;

        let movie = self.db.upsert_movie(&id, &fields).await?;
        info!(id = %movie.id, "movie updated");

        self.populate(movie).await
    }

    pub async fn delete(&self, id: &str) -> CatalogResult<()> {
        let id = check_id(id)?;

        if self.db.delete_movie(&id).await? == 0 {
            return Err(CatalogError::NotFound(NO_MOVIE));
        }
        info!(id = %id, "movie deleted");
        Ok(())
    }

    pub async fn watch_list(&self, user: &ActingUser) -> CatalogResult<Vec<Movie>> {
        Ok(self.db.get_watch_list(&user.id).await?)
    }

    pub async fn add_to_watch_list(
        &self,
        user: &ActingUser,
        movie_id: &str,
    ) -> CatalogResult<Vec<Movie>> {
        let movie_id = check_id(movie_id)?;

        let entry = WatchListEntry {
            userid: user.id.clone(),
            movieid: movie_id.clone(),
        };
        self.db.add_to_watch_list(&entry).await?;
        debug!(user = %user.username, movie = %movie_id, "added to watch list");

        self.watch_list(user).await
    }

    pub async fn remove_from_watch_list(
        &self,
        user: &ActingUser,
        movie_id: &str,
    ) -> CatalogResult<Vec<Movie>> {
        let movie_id = check_id(movie_id)?;

        let entry = WatchListEntry {
            userid: user.id.clone(),
            movieid: movie_id.clone(),
        };
        if self.db.remove_from_watch_list(&entry).await? == 0 {
            return Err(CatalogError::NotFound(NO_WATCH_LIST_ITEM));
        }
        debug!(user = %user.username, movie = %movie_id, "removed from watch list");

        self.watch_list(user).await
    }

    /// Sets the user's reaction if they have none, otherwise clears the
    /// existing one whatever `kind` is. Switching from like to dislike
    /// therefore takes two calls. The movie's counters are recounted from
    /// the reaction records afterwards.
    pub async fn react(
        &self,
        user: &ActingUser,
        movie_id: &str,
        kind: ReactionKind,
    ) -> CatalogResult<Movie> {
        let movie_id = check_id(movie_id)?;

        // Make sure the movie exists before touching any reaction records.
        self.db.get_movie(&movie_id).await.map_err(not_found(NO_MOVIE))?;

        match self.db.find_reaction(&user.id, &movie_id).await? {
            None => {
                let reaction = MovieReaction {
                    id: generate_id(),
                    userid: user.id.clone(),
                    movieid: movie_id.clone(),
                    kind,
                };
                self.db.insert_reaction(&reaction).await?;
                debug!(user = %user.username, movie = %movie_id, kind = %kind, "reaction added");
            }
            Some(existing) => {
                self.db.delete_reaction(&existing.id).await?;
                debug!(user = %user.username, movie = %movie_id, kind = %existing.kind, "reaction removed");
            }
        }

        self.recount_reactions(&movie_id).await
    }

    async fn recount_reactions(&self, movie_id: &str) -> CatalogResult<Movie> {
        let likes = self.db.count_reactions(movie_id, ReactionKind::Like).await?;
        let dislikes = self.db.count_reactions(movie_id, ReactionKind::Dislike).await?;

        if !self
            .db
            .set_reaction_counts(movie_id, likes as i64, dislikes as i64)
            .await?
        {
            return Err(CatalogError::NotFound(NO_MOVIE));
        }
        Ok(self.db.get_movie(movie_id).await?)
    }

    /// All movies sharing at least one genre with `genres`. Unbounded.
    pub async fn related(&self, genres: &[String]) -> CatalogResult<Vec<Movie>> {
        if genres.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.db.find_movies_by_genres(genres).await?)
    }

    pub async fn top_rated(&self) -> CatalogResult<Vec<Movie>> {
        Ok(self.db.top_rated(self.top_rated_limit).await?)
    }

    pub async fn genres(&self) -> CatalogResult<Vec<Genre>> {
        Ok(self.db.list_genres().await?)
    }

    pub async fn create_genre(&self, name: &str) -> CatalogResult<Genre> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::MissingField(GENRE_NAME_MISSING));
        }
        let genre = Genre {
            id: generate_id(),
            name: name.to_string(),
        };
        self.db.insert_genre(&genre).await?;
        info!(id = %genre.id, name = %genre.name, "genre created");
        Ok(genre)
    }
}

fn not_found(message: &'static str) -> impl Fn(DbError) -> CatalogError {
    move |e| match e {
        DbError::NotFound(_) => CatalogError::NotFound(message),
        other => CatalogError::Database(other),
    }
}
