use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::auth::CurrentUser;
use super::extract::JsonBody;
use super::types::*;
use crate::catalog::{CatalogError, CatalogResult, MovieDetail, MoviePage};
use crate::db::{Genre, Movie, MovieFields, ReactionKind};
use crate::server::AppState;
use crate::util::QueryParams;

pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> CatalogResult<Json<MoviePage>> {
    Ok(Json(state.movies.list(params).await?))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> CatalogResult<Json<MovieDetail>> {
    Ok(Json(state.movies.show(&movie_id).await?))
}

pub async fn create_movie(
    State(state): State<AppState>,
    JsonBody(fields): JsonBody<MovieFields>,
) -> CatalogResult<(StatusCode, Json<MovieDetail>)> {
    let movie = state.movies.create(fields).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
    JsonBody(fields): JsonBody<MovieFields>,
) -> CatalogResult<Json<MovieDetail>> {
    Ok(Json(state.movies.update(&movie_id, fields).await?))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> CatalogResult<StatusCode> {
    state.movies.delete(&movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_top_rated(State(state): State<AppState>) -> CatalogResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.top_rated().await?))
}

pub async fn get_related(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RelatedRequest>,
) -> CatalogResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.related(&req.genres).await?))
}

pub async fn add_to_watch_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<String>,
) -> CatalogResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.add_to_watch_list(&user, &movie_id).await?))
}

pub async fn remove_from_watch_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<String>,
) -> CatalogResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.remove_from_watch_list(&user, &movie_id).await?))
}

pub async fn get_watch_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> CatalogResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.watch_list(&user).await?))
}

pub async fn react_on_movie(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movie_id): Path<String>,
    JsonBody(req): JsonBody<ReactionRequest>,
) -> CatalogResult<Json<Movie>> {
    let kind = ReactionKind::from_name(&req.reaction_type)
        .ok_or(CatalogError::InvalidReaction(req.reaction_type))?;
    Ok(Json(state.movies.react(&user, &movie_id, kind).await?))
}

pub async fn list_genres(State(state): State<AppState>) -> CatalogResult<Json<Vec<Genre>>> {
    Ok(Json(state.movies.genres().await?))
}

pub async fn create_genre(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GenreRequest>,
) -> CatalogResult<(StatusCode, Json<Genre>)> {
    let genre = state.movies.create_genre(&req.name).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}
