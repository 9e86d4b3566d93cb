use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    error::{method_not_allowed, ApiError},
    home::home,
    state::AppState,
    users,
};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home).fallback(method_not_allowed))
        .merge(users::router())
        .fallback(|| async { ApiError::NotFound("route not found".into()) })
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        auth::USER_ID_HEADER,
        responses::ENTITY_HEADER,
        users::{repo_types::NewUser, seed::seed_users},
    };

    /// In-memory app with the two seeded users plus generated users up to `last_id`.
    async fn app_with_users(last_id: u32) -> (Router, AppState) {
        let state = AppState::in_memory();
        seed_users(state.users.as_ref()).await.unwrap();
        for n in 3..=last_id {
            let user = NewUser {
                first_name: format!("First{n}"),
                last_name: format!("Last{n}"),
                email: format!("user{n}@example.com"),
                phone: format!("555-{n}"),
                password_hash: "hash".into(),
            };
            state.users.create(user).await.unwrap();
        }
        (build_app(state.clone()), state)
    }

    fn request(method: Method, uri: &str, caller: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(&USER_ID_HEADER, caller);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        builder.body(body).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content_type(res: &Response) -> &str {
        res.headers()[header::CONTENT_TYPE].to_str().unwrap()
    }

    #[tokio::test]
    async fn home_returns_welcome_string() {
        let (app, _) = app_with_users(2).await;
        let res = send(&app, request(Method::GET, "/", None, None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), "application/json");
        assert_eq!(json_body(res).await, json!("Welcome To This Awesome API"));
    }

    #[tokio::test]
    async fn list_needs_no_header_and_hides_passwords() {
        let (app, _) = app_with_users(3).await;
        let res = send(&app, request(Method::GET, "/users", None, None)).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = json_body(res).await;
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0]["id"], 1);
        assert_eq!(users[0]["first_name"], "John");
        assert!(users[0].get("password").is_none());
        assert!(users[0].get("password_hash").is_none());
        assert!(users[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn current_user_matches_get_by_id() {
        let (app, _) = app_with_users(7).await;
        let current = send(&app, request(Method::GET, "/current-user", Some("7"), None)).await;
        assert_eq!(current.status(), StatusCode::OK);
        let by_id = send(&app, request(Method::GET, "/users/7", Some("7"), None)).await;
        assert_eq!(by_id.status(), StatusCode::OK);

        let current = json_body(current).await;
        assert_eq!(current["id"], 7);
        assert_eq!(current, json_body(by_id).await);
    }

    #[tokio::test]
    async fn any_caller_may_read_any_user() {
        let (app, _) = app_with_users(2).await;
        let res = send(&app, request(Method::GET, "/users/2", Some("1"), None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["email"], "tony.p@gmail.com");
    }

    #[tokio::test]
    async fn missing_header_is_bad_request_on_every_protected_route() {
        let (app, _) = app_with_users(2).await;
        let body = json!({"first_name":"A","last_name":"B","email":"a@b.io"});
        let cases = [
            (Method::GET, "/current-user", None),
            (Method::GET, "/users/1", None),
            (Method::PUT, "/users/1", Some(body)),
            (Method::DELETE, "/users/1", None),
        ];
        for (method, uri, body) in cases {
            let res = send(&app, request(method.clone(), uri, None, body)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{method} {uri}");
            assert_eq!(
                json_body(res).await,
                json!({"error": "User is not authorised"}),
                "{method} {uri}"
            );
        }
    }

    #[tokio::test]
    async fn malformed_header_is_bad_request() {
        let (app, _) = app_with_users(2).await;
        for caller in ["abc", "-1", "+1", "99999999999"] {
            let res = send(&app, request(Method::GET, "/current-user", Some(caller), None)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{caller}");
            let body = json_body(res).await;
            assert!(body["error"].as_str().unwrap().contains("X-UserId"));
        }
    }

    #[tokio::test]
    async fn malformed_header_wins_over_body_on_mutations() {
        let (app, state) = app_with_users(2).await;
        let before = state.users.find_by_id(1).await.unwrap();

        // invalid JSON would be 422 if the body were read first
        let put = Request::builder()
            .method(Method::PUT)
            .uri("/users/1")
            .header(&USER_ID_HEADER, "abc")
            .body(Body::from("{not json"))
            .unwrap();
        let delete = request(Method::DELETE, "/users/1", Some("+1"), None);
        for req in [put, delete] {
            let label = format!("{} {}", req.method(), req.uri());
            let res = send(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{label}");
            assert_eq!(content_type(&res), "application/json", "{label}");
            let body = json_body(res).await;
            assert!(
                body["error"].as_str().unwrap().contains("X-UserId"),
                "{label}"
            );
        }

        assert_eq!(state.users.find_by_id(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn malformed_path_id_is_bad_request() {
        let (app, _) = app_with_users(2).await;
        for uri in ["/users/abc", "/users/-1", "/users/4294967296"] {
            let res = send(&app, request(Method::GET, uri, Some("1"), None)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(json_body(res).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn undecodable_path_id_uses_error_envelope() {
        let (app, _) = app_with_users(2).await;
        let body = json!({"first_name":"A","last_name":"B","email":"a@b.io"});
        let cases = [
            (Method::GET, None),
            (Method::PUT, Some(body)),
            (Method::DELETE, None),
        ];
        for (method, body) in cases {
            let res = send(&app, request(method.clone(), "/users/%FF", Some("1"), body)).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(content_type(&res), "application/json", "{method}");
            assert!(json_body(res).await["error"].is_string(), "{method}");
        }
    }

    #[tokio::test]
    async fn oversized_update_body_uses_error_envelope() {
        let (app, state) = app_with_users(2).await;
        let before = state.users.find_by_id(1).await.unwrap();

        let req = Request::builder()
            .method(Method::PUT)
            .uri("/users/1")
            .header(&USER_ID_HEADER, "1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(vec![b' '; 3 * 1024 * 1024]))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&res), "application/json");
        assert!(json_body(res).await["error"].is_string());

        assert_eq!(state.users.find_by_id(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn update_own_user_returns_exact_fields() {
        let (app, _) = app_with_users(5).await;
        let body = json!({
            "first_name": "Ann",
            "last_name": "Lee",
            "email": "ann@example.com",
            "phone": "123"
        });
        let res = send(&app, request(Method::PUT, "/users/5", Some("5"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), "application/json");

        let user = json_body(res).await;
        assert_eq!(user["id"], 5);
        assert_eq!(user["first_name"], "Ann");
        assert_eq!(user["last_name"], "Lee");
        assert_eq!(user["email"], "ann@example.com");
        assert_eq!(user["phone"], "123");

        let fetched = send(&app, request(Method::GET, "/users/5", Some("5"), None)).await;
        assert_eq!(json_body(fetched).await, user);
    }

    #[tokio::test]
    async fn update_body_id_cannot_change_identity() {
        let (app, state) = app_with_users(2).await;
        let body = json!({"id": 99, "first_name":"Ann","last_name":"Lee","email":"ann@example.com"});
        let res = send(&app, request(Method::PUT, "/users/2", Some("2"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["id"], 2);
        assert!(state.users.find_by_id(99).await.is_err());
    }

    #[tokio::test]
    async fn mismatched_owner_cannot_mutate() {
        let (app, state) = app_with_users(3).await;
        let before = state.users.find_by_id(3).await.unwrap();

        let body = json!({"first_name":"Eve","last_name":"X","email":"eve@example.com"});
        let res = send(&app, request(Method::PUT, "/users/3", Some("1"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(res).await,
            json!({"error": "You are not authorised to do that"})
        );

        let res = send(&app, request(Method::DELETE, "/users/3", Some("1"), None)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.users.find_by_id(3).await.unwrap(), before);
    }

    #[tokio::test]
    async fn invalid_update_bodies_are_unprocessable() {
        let (app, state) = app_with_users(2).await;
        let before = state.users.find_by_id(1).await.unwrap();

        let cases = [
            (
                json!({"last_name":"Lee","email":"ann@example.com"}),
                "Required First Name",
            ),
            (
                json!({"first_name":"Ann","email":"ann@example.com"}),
                "Required Last Name",
            ),
            (
                json!({"first_name":"Ann","last_name":"Lee","email":"ann-at-example"}),
                "Invalid Email",
            ),
            (
                json!({"first_name":" ","last_name":"","email":""}),
                "Required First Name, Required Last Name, Required Email",
            ),
        ];
        for (body, message) in cases {
            let res = send(&app, request(Method::PUT, "/users/1", Some("1"), Some(body))).await;
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(json_body(res).await, json!({"error": message}));
        }

        assert_eq!(state.users.find_by_id(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let (app, _) = app_with_users(2).await;
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/users/1")
            .header(&USER_ID_HEADER, "1")
            .body(Body::from("{not json"))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(res).await["error"].is_string());
    }

    #[tokio::test]
    async fn duplicate_email_is_formatted() {
        let (app, _) = app_with_users(2).await;
        let body = json!({"first_name":"Tony","last_name":"P","email":"john.doe@gmail.com"});
        let res = send(&app, request(Method::PUT, "/users/2", Some("2"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(res).await, json!({"error": "Email Already Taken"}));

        let body = json!({"first_name":"Tony","last_name":"P","email":"tony@example.com","phone":"532532"});
        let res = send(&app, request(Method::PUT, "/users/2", Some("2"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(res).await, json!({"error": "Phone Already Taken"}));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let (app, _) = app_with_users(2).await;
        let body = json!({"first_name":"Ann","last_name":"Lee","email":"ann@example.com"});
        let res = send(&app, request(Method::PUT, "/users/40", Some("40"), Some(body))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_own_user_then_get_is_not_found() {
        let (app, _) = app_with_users(3).await;
        let res = send(&app, request(Method::DELETE, "/users/3", Some("3"), None)).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()[&ENTITY_HEADER], "3");
        assert_eq!(content_type(&res), "application/json");
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let res = send(&app, request(Method::GET, "/users/3", Some("3"), None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await, json!({"error": "User Not Found"}));

        let res = send(&app, request(Method::DELETE, "/users/3", Some("3"), None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_and_wrong_method() {
        let (app, _) = app_with_users(2).await;
        let res = send(&app, request(Method::GET, "/nope", None, None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await, json!({"error": "route not found"}));

        let cases = [
            (Method::POST, "/users"),
            (Method::PATCH, "/users/1"),
            (Method::POST, "/current-user"),
            (Method::DELETE, "/"),
        ];
        for (method, uri) in cases {
            let res = send(&app, request(method.clone(), uri, Some("1"), None)).await;
            assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
            assert_eq!(content_type(&res), "application/json", "{method} {uri}");
            assert_eq!(
                json_body(res).await,
                json!({"error": format!("method {method} not allowed")}),
                "{method} {uri}"
            );
        }
    }
}
