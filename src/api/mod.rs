pub mod auth;
pub mod extract;
pub mod handlers;
pub mod types;

pub use auth::*;
pub use extract::JsonBody;
pub use handlers::*;
pub use types::*;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/movies", get(list_movies).post(create_movie))
        .route("/api/movies/top-rated", get(get_top_rated))
        .route("/api/movies/related", post(get_related))
        .route(
            "/api/movies/:id",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route(
            "/api/movies/:id/watch-list",
            post(add_to_watch_list).delete(remove_from_watch_list),
        )
        .route("/api/movies/:id/reactions", post(react_on_movie))
        .route("/api/me/watch-list", get(get_watch_list))
        .route("/api/genres", get(list_genres).post(create_genre))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::{AccessToken, AccessTokenRepo, MemoryRepository, User, UserRepo};
    use crate::server::{build_router, AppState};

    const TOKEN: &str = "test-token";

    async fn app() -> Router {
        let repo = Arc::new(MemoryRepository::new());
        repo.insert_user(&User {
            id: "u1".into(),
            username: "alice".into(),
            password: bcrypt::hash("secret", 4).unwrap(),
            created: None,
        })
        .await
        .unwrap();
        repo.insert_token(&AccessToken {
            token: TOKEN.into(),
            userid: "u1".into(),
            created: None,
        })
        .await
        .unwrap();
        build_router(AppState::new(Config::default(), repo))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", TOKEN));
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, title: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/movies",
            Some(json!({ "title": title, "description": "desc", "genres": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_movie_crud() {
        let app = app().await;
        let id = create(&app, "Brazil").await;

        let (status, body) = send(&app, "GET", &format!("/api/movies/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visits"], 1);
        assert_eq!(body["genres"], json!([]));

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/movies/{}", id),
            Some(json!({ "title": "Brazil (1985)", "description": "desc", "imageUrl": "b.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageUrl"], "b.jpg");

        let (status, body) = send(&app, "GET", "/api/movies?title=braz&limit=abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/movies/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/api/movies/{}", id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No movie with that id");
    }

    #[tokio::test]
    async fn test_errors_are_bad_requests() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/movies/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "Malformed id!");

        let (status, body) = send(
            &app,
            "POST",
            "/api/movies",
            Some(json!({ "title": "No description" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Title or description missing");

        let (status, _) = send(&app, "GET", "/api/movies?director=x", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_watch_list_and_reactions_need_a_token() {
        let app = app().await;
        let id = create(&app, "Solaris").await;

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/movies/{}/watch-list", id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, "POST", &format!("/api/movies/{}/watch-list", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(&app, "GET", "/api/me/watch-list", None).await;
        assert_eq!(body[0]["id"], id.as_str());

        let (status, body) =
            send(&app, "DELETE", &format!("/api/movies/{}/watch-list", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) =
            send(&app, "DELETE", &format!("/api/movies/{}/watch-list", id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No such watch list item!");

        let uri = format!("/api/movies/{}/reactions", id);
        let (status, body) = send(&app, "POST", &uri, Some(json!({ "reactionType": "LIKE" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["likes"], 1);
        assert_eq!(body["dislikes"], 0);

        let (_, body) = send(&app, "POST", &uri, Some(json!({ "reactionType": "DISLIKE" }))).await;
        assert_eq!(body["likes"], 0);
        assert_eq!(body["dislikes"], 0);

        let (status, _) = send(&app, "POST", &uri, Some(json!({ "reactionType": "MEH" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, "GET", "/api/movies/top-rated", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_genres_and_related() {
        let app = app().await;
        let (status, genre) = send(&app, "POST", "/api/genres", Some(json!({ "name": "Noir" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let genre_id = genre["id"].as_str().unwrap().to_string();

        let (_, movie) = send(
            &app,
            "POST",
            "/api/movies",
            Some(json!({ "title": "Laura", "description": "desc", "genres": [genre_id.clone()] })),
        )
        .await;
        assert_eq!(movie["genres"][0]["name"], "Noir");

        let (_, related) = send(
            &app,
            "POST",
            "/api/movies/related",
            Some(json!({ "genres": [genre_id] })),
        )
        .await;
        assert_eq!(related[0]["title"], "Laura");

        let (_, genres) = send(&app, "GET", "/api/genres", None).await;
        assert_eq!(genres.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({ "username": "alice", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["accessToken"].as_str().is_some());

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({ "username": "alice", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_duplicate_slashes_are_collapsed() {
        let app = app().await;
        create(&app, "Ran").await;

        let (status, body) = send(&app, "GET", "//api//movies?title=ran", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, _) = send(&app, "GET", "/api///movies/top-rated", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejections_use_error_body() {
        let app = app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/genres")
            .header("Authorization", format!("Bearer {}", TOKEN))
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 400);
        assert!(body["message"].as_str().is_some());

        let id = create(&app, "Ikiru").await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/movies/{}/reactions", id),
            Some(json!({ "kind": "LIKE" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 422);

        let request = Request::builder()
            .method("GET")
            .uri("/api/me/watch-list")
            .header("Authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Missing or invalid access token");
    }

    #[tokio::test]
    async fn test_register_and_logout() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({ "username": "alice", "password": "other" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({ "username": "bob", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["accessToken"].as_str().unwrap().to_string();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header("X-Access-Token", token.as_str())
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/me/watch-list?api_key={}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
