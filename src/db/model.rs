use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub userid: String,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    pub id: String,
    pub name: String,
}

/// A catalog entry. `genres` holds genre ids; the counters are owned by
/// the store and only ever changed through the dedicated repo calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub genres: Vec<String>,
    pub visits: i64,
    pub likes: i64,
    pub dislikes: i64,
}

/// The caller-writable part of a movie, used by create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl Movie {
    pub fn new(id: String, fields: MovieFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            image_url: fields.image_url,
            genres: fields.genres,
            visits: 0,
            likes: 0,
            dislikes: 0,
        }
    }

    pub fn apply(&mut self, fields: MovieFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.image_url = fields.image_url;
        self.genres = fields.genres;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchListEntry {
    pub userid: String,
    pub movieid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LIKE" => Some(ReactionKind::Like),
            "DISLIKE" => Some(ReactionKind::Dislike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "LIKE",
            ReactionKind::Dislike => "DISLIKE",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieReaction {
    pub id: String,
    pub userid: String,
    pub movieid: String,
    pub kind: ReactionKind,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid stored value: {0}")]
    Decode(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;
