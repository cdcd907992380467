use std::fmt::Write;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::*;
use super::query::{MovieFilter, MovieQuery};
use super::repo::*;

type MovieRow = (String, String, String, Option<String>, String, i64, i64, i64);

const MOVIE_COLUMNS: &str = "id, title, description, imageurl, genres, visits, likes, dislikes";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own empty
        // database, so keep exactly one alive.
        let pool = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }
}

fn movie_from_row(row: MovieRow) -> DbResult<Movie> {
    Ok(Movie {
        id: row.0,
        title: row.1,
        description: row.2,
        image_url: row.3,
        genres: serde_json::from_str(&row.4)?,
        visits: row.5,
        likes: row.6,
        dislikes: row.7,
    })
}

fn movies_from_rows(rows: Vec<MovieRow>) -> DbResult<Vec<Movie>> {
    rows.into_iter().map(movie_from_row).collect()
}

fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn genre_in_clause(clause: &mut String, binds: &mut Vec<String>, values: &[String]) {
    if values.is_empty() {
        clause.push('0');
        return;
    }
    let _ = write!(
        clause,
        "EXISTS (SELECT 1 FROM json_each(movies.genres) WHERE json_each.value IN ({}))",
        placeholders(values.len())
    );
    binds.extend(values.iter().cloned());
}

/// Translates a movie query into a SQL WHERE clause plus its bind values.
/// Titles are matched against `title_lc`, which holds the title lowercased
/// on the Rust side, since SQLite's `LOWER()` and `LIKE` only fold ASCII.
fn where_clause(query: &[MovieFilter]) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut binds = Vec::new();

    for filter in query {
        clause.push_str(if clause.is_empty() { " WHERE " } else { " AND " });
        match filter {
            MovieFilter::TitlePrefix(prefix) => {
                clause.push_str("title_lc LIKE ? ESCAPE '\\'");
                binds.push(like_prefix(prefix));
            }
            MovieFilter::GenreIn(values) => genre_in_clause(&mut clause, &mut binds, values),
        }
    }

    (clause, binds)
}

fn parse_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn get_user(&self, username: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, password, created FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", username)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn get_user_by_id(&self, id: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, password, created FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn insert_user(&self, user: &User) -> DbResult<()> {
        sqlx::query("INSERT INTO users (id, username, password, created) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.created)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref dbe) if dbe.is_unique_violation() => {
                    DbError::AlreadyExists(format!("User already exists: {}", user.username))
                }
                _ => DbError::Sqlx(e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepo for SqliteRepository {
    async fn get_token(&self, token: &str) -> DbResult<AccessToken> {
        let result = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT token, userid, created FROM accesstokens WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound("Token not found".to_string()),
            _ => DbError::Sqlx(e),
        })?;

        Ok(AccessToken {
            token: result.0,
            userid: result.1,
            created: parse_timestamp(result.2),
        })
    }

    async fn insert_token(&self, token: &AccessToken) -> DbResult<()> {
        sqlx::query("INSERT INTO accesstokens (token, userid, created) VALUES (?, ?, ?)")
            .bind(&token.token)
            .bind(&token.userid)
            .bind(token.created.as_ref().map(|dt| dt.to_rfc3339()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_token(&self, token: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM accesstokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GenreRepo for SqliteRepository {
    async fn list_genres(&self) -> DbResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(genres)
    }

    async fn get_genres(&self, ids: &[String]) -> DbResult<Vec<Genre>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, name FROM genres WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, Genre>(&sql);
        for id in ids {
            query = query.bind(id.as_str());
        }
        let found = query.fetch_all(&self.pool).await?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|g| &g.id == id).cloned())
            .collect())
    }

    async fn insert_genre(&self, genre: &Genre) -> DbResult<()> {
        sqlx::query("INSERT INTO genres (id, name) VALUES (?, ?)")
            .bind(&genre.id)
            .bind(&genre.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn find_movies(
        &self,
        query: &MovieQuery,
        limit: u64,
        offset: u64,
    ) -> DbResult<Vec<Movie>> {
        let (clause, binds) = where_clause(query);
        let sql = format!(
            "SELECT {} FROM movies{} ORDER BY rowid LIMIT ? OFFSET ?",
            MOVIE_COLUMNS, clause
        );
        debug!("find_movies: {}", sql);

        let mut q = sqlx::query_as::<_, MovieRow>(&sql);
        for value in &binds {
            q = q.bind(value.as_str());
        }
        let rows = q
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        movies_from_rows(rows)
    }

    async fn count_movies(&self, query: &MovieQuery) -> DbResult<u64> {
        let (clause, binds) = where_clause(query);
        let sql = format!("SELECT COUNT(*) FROM movies{}", clause);

        let mut q = sqlx::query_as::<_, (i64,)>(&sql);
        for value in &binds {
            q = q.bind(value.as_str());
        }
        let count = q.fetch_one(&self.pool).await?.0;

        Ok(count as u64)
    }

    async fn get_movie(&self, id: &str) -> DbResult<Movie> {
        let sql = format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS);
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("Movie not found: {}", id)),
                _ => DbError::Sqlx(e),
            })?;

        movie_from_row(row)
    }

    async fn insert_movie(&self, movie: &Movie) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO movies
            (id, title, title_lc, description, imageurl, genres, visits, likes, dislikes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(movie.title.to_lowercase())
        .bind(&movie.description)
        .bind(&movie.image_url)
        .bind(serde_json::to_string(&movie.genres)?)
        .bind(movie.visits)
        .bind(movie.likes)
        .bind(movie.dislikes)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref dbe) if dbe.is_unique_violation() => {
                DbError::AlreadyExists(format!("Movie already exists: {}", movie.id))
            }
            _ => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    async fn upsert_movie(&self, id: &str, fields: &MovieFields) -> DbResult<Movie> {
        sqlx::query(
            "INSERT INTO movies (id, title, title_lc, description, imageurl, genres)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                title_lc = excluded.title_lc,
                description = excluded.description,
                imageurl = excluded.imageurl,
                genres = excluded.genres",
        )
        .bind(id)
        .bind(&fields.title)
        .bind(fields.title.to_lowercase())
        .bind(&fields.description)
        .bind(&fields.image_url)
        .bind(serde_json::to_string(&fields.genres)?)
        .execute(&self.pool)
        .await?;

        self.get_movie(id).await
    }

    async fn delete_movie(&self, id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn increment_visits(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE movies SET visits = visits + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_reaction_counts(&self, id: &str, likes: i64, dislikes: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE movies SET likes = ?, dislikes = ? WHERE id = ?")
            .bind(likes)
            .bind(dislikes)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_movies_by_genres(&self, genres: &[String]) -> DbResult<Vec<Movie>> {
        let mut clause = String::from(" WHERE ");
        let mut binds = Vec::new();
        genre_in_clause(&mut clause, &mut binds, genres);
        let sql = format!("SELECT {} FROM movies{} ORDER BY rowid", MOVIE_COLUMNS, clause);

        let mut q = sqlx::query_as::<_, MovieRow>(&sql);
        for value in &binds {
            q = q.bind(value.as_str());
        }
        let rows = q.fetch_all(&self.pool).await?;

        movies_from_rows(rows)
    }

    async fn top_rated(&self, limit: u64) -> DbResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {} FROM movies ORDER BY likes DESC, rowid LIMIT ?",
            MOVIE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        movies_from_rows(rows)
    }
}

#[async_trait]
impl WatchListRepo for SqliteRepository {
    async fn add_to_watch_list(&self, entry: &WatchListEntry) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO watchlist (userid, movieid) VALUES (?, ?)")
            .bind(&entry.userid)
            .bind(&entry.movieid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_from_watch_list(&self, entry: &WatchListEntry) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM watchlist WHERE userid = ? AND movieid = ?")
            .bind(&entry.userid)
            .bind(&entry.movieid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_watch_list(&self, user_id: &str) -> DbResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(
            "SELECT m.id, m.title, m.description, m.imageurl, m.genres, m.visits, m.likes, m.dislikes
             FROM watchlist w JOIN movies m ON m.id = w.movieid
             WHERE w.userid = ?
             ORDER BY w.rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        movies_from_rows(rows)
    }
}

#[async_trait]
impl ReactionRepo for SqliteRepository {
    async fn find_reaction(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> DbResult<Option<MovieReaction>> {
        let result = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT id, userid, movieid, reactiontype FROM movie_reactions
             WHERE userid = ? AND movieid = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;

        match result {
            Some(r) => Ok(Some(MovieReaction {
                id: r.0,
                userid: r.1,
                movieid: r.2,
                kind: ReactionKind::from_name(&r.3)
                    .ok_or_else(|| DbError::Decode(format!("unknown reaction kind: {}", r.3)))?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_reaction(&self, reaction: &MovieReaction) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO movie_reactions (id, userid, movieid, reactiontype) VALUES (?, ?, ?, ?)",
        )
        .bind(&reaction.id)
        .bind(&reaction.userid)
        .bind(&reaction.movieid)
        .bind(reaction.kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_reaction(&self, id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM movie_reactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_reactions(&self, movie_id: &str, kind: ReactionKind) -> DbResult<u64> {
        let count = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM movie_reactions WHERE movieid = ? AND reactiontype = ?",
        )
        .bind(movie_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?
        .0;
        Ok(count as u64)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }
}
