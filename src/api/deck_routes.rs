use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

use super::deck_websocket;
use crate::activity::Container;
use crate::error::DeckError;
use crate::peer::{HostSession, RoomCode};

#[derive(Debug, Deserialize)]
struct BubbleQuery {
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NewThought {
    text: String,
}

type JsonReply = WithStatus<Json>;

/// Every route the host serves
pub fn deck_routes(
    session: Arc<HostSession>,
    join_link: String,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    peer_websocket_route(session.clone())
        .or(view_websocket_route(session.clone()))
        .or(deck_health_check())
        .or(deck_config_endpoint(session.clone(), join_link))
        .or(deck_stats_endpoint(session.clone()))
        .or(deck_thoughts_endpoint(session.clone()))
        .or(deck_add_thought_endpoint(session.clone()))
        .or(deck_bubbles_endpoint(session.clone()))
        .or(deck_reset_endpoint(session.clone()))
        .or(deck_reload_endpoint(session))
}

/// Student data channel at `/peer/<host-peer-id>`. Any other id is a 404,
/// which clients report as "host not found".
pub fn peer_websocket_route(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("peer")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_session(session))
        .and_then(|peer_id: String, ws: warp::ws::Ws, session: Arc<HostSession>| async move {
            if RoomCode::from_host_peer_id(&peer_id).as_ref() != Some(session.room_code()) {
                tracing::warn!(peer_id = %peer_id, "Connection attempt for unknown host");
                return Err(warp::reject::not_found());
            }
            Ok::<_, warp::Rejection>(ws.on_upgrade(move |websocket| {
                deck_websocket::handle_student_socket(websocket, session)
            }))
        })
}

pub fn view_websocket_route(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "view")
        .and(warp::ws())
        .and(with_session(session))
        .map(|ws: warp::ws::Ws, session: Arc<HostSession>| {
            ws.on_upgrade(move |websocket| deck_websocket::handle_view_socket(websocket, session))
        })
}

pub fn deck_health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Class Deck",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

pub fn deck_config_endpoint(
    session: Arc<HostSession>,
    join_link: String,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "config")
        .and(warp::get())
        .and(with_session(session))
        .and_then(move |session: Arc<HostSession>| {
            let join_link = join_link.clone();
            async move {
                let config = serde_json::json!({
                    "room_code": session.room_code(),
                    "host_peer_id": session.host_peer_id(),
                    "join_link": join_link,
                    "question_count": session.question_count().await,
                    "status": session.status().await,
                    "students": session.connected_peers().await.len()
                });
                Ok::<_, Infallible>(warp::reply::json(&config))
            }
        })
}

pub fn deck_stats_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "stats")
        .and(warp::get())
        .and(with_session(session))
        .and_then(|session: Arc<HostSession>| async move {
            Ok::<_, Infallible>(warp::reply::json(&session.snapshot().await))
        })
}

pub fn deck_thoughts_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "thoughts")
        .and(warp::get())
        .and(with_session(session))
        .and_then(|session: Arc<HostSession>| async move {
            let reply = match session.thoughts().await {
                Ok(thoughts) => ok_json(&thoughts, StatusCode::OK),
                Err(e) => error_reply(e),
            };
            Ok::<_, Infallible>(reply)
        })
}

/// Instructor adds a thought from the deck
pub fn deck_add_thought_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "thoughts")
        .and(warp::post())
        .and(warp::body::json::<NewThought>())
        .and(with_session(session))
        .and_then(|body: NewThought, session: Arc<HostSession>| async move {
            let reply = match session.add_thought(&body.text).await {
                Ok(Some(thought)) => ok_json(&thought, StatusCode::CREATED),
                Ok(None) => ok_json(
                    &serde_json::json!({ "error": "thought text is empty" }),
                    StatusCode::BAD_REQUEST,
                ),
                Err(e) => error_reply(e),
            };
            Ok::<_, Infallible>(reply)
        })
}

pub fn deck_bubbles_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "bubbles")
        .and(warp::get())
        .and(warp::query::<BubbleQuery>())
        .and(with_session(session))
        .and_then(|query: BubbleQuery, session: Arc<HostSession>| async move {
            let container = Container::new(query.width.unwrap_or(0.0), query.height.unwrap_or(0.0));
            let reply = match session.bubbles(container).await {
                Ok(bubbles) => ok_json(&bubbles, StatusCode::OK),
                Err(e) => error_reply(e),
            };
            Ok::<_, Infallible>(reply)
        })
}

pub fn deck_reset_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "reset")
        .and(warp::post())
        .and(with_session(session))
        .and_then(|session: Arc<HostSession>| async move {
            let reply = match session.reset().await {
                Ok(()) => ok_json(&session.snapshot().await, StatusCode::OK),
                Err(e) => error_reply(e),
            };
            Ok::<_, Infallible>(reply)
        })
}

/// Re-read stored results after the data files were changed outside this process
pub fn deck_reload_endpoint(
    session: Arc<HostSession>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("deck" / "reload")
        .and(warp::post())
        .and(with_session(session))
        .and_then(|session: Arc<HostSession>| async move {
            session.reload().await;
            Ok::<_, Infallible>(warp::reply::json(&session.snapshot().await))
        })
}

fn with_session(
    session: Arc<HostSession>,
) -> impl Filter<Extract = (Arc<HostSession>,), Error = Infallible> + Clone {
    warp::any().map(move || session.clone())
}

fn ok_json<T: serde::Serialize>(value: &T, status: StatusCode) -> JsonReply {
    warp::reply::with_status(warp::reply::json(value), status)
}

fn error_reply(error: DeckError) -> JsonReply {
    tracing::error!(error = %error, "Request failed");
    ok_json(
        &serde_json::json!({ "error": error.to_string() }),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{QuizAnswerKey, QuizStats};
    use crate::storage::{ClassStore, MemoryStore};

    fn session() -> Arc<HostSession> {
        let store = ClassStore::open(Arc::new(MemoryStore::new()), 10);
        HostSession::new("AB12".parse().unwrap(), QuizAnswerKey::parse("1=B").unwrap(), store)
    }

    async fn recv_json(client: &mut warp::test::WsClient) -> serde_json::Value {
        let message = client.recv().await.unwrap();
        serde_json::from_str(message.to_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let routes = deck_routes(session(), "http://localhost:8080/student.html?room=AB12".into());
        let resp = warp::test::request().path("/deck/health").reply(&routes).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_config_reports_room() {
        let routes = deck_routes(session(), "http://localhost:8080/student.html?room=AB12".into());
        let resp = warp::test::request().path("/deck/config").reply(&routes).await;

        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["room_code"], "AB12");
        assert_eq!(body["host_peer_id"], "tcu-deck-AB12");
        assert_eq!(body["question_count"], 10);
    }

    #[tokio::test]
    async fn test_add_thought_and_bubbles() {
        let session = session();
        let routes = deck_routes(session.clone(), String::new());

        let resp = warp::test::request()
            .method("POST")
            .path("/deck/thoughts")
            .json(&serde_json::json!({ "text": "this is awesome" }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 201);

        let resp = warp::test::request()
            .method("POST")
            .path("/deck/thoughts")
            .json(&serde_json::json!({ "text": "   " }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 400);

        let resp = warp::test::request()
            .path("/deck/bubbles?width=1000&height=600")
            .reply(&routes)
            .await;
        let bubbles: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(bubbles.as_array().unwrap().len(), 1);
        assert_eq!(bubbles[0]["tone"], "positive");
    }

    #[tokio::test]
    async fn test_reset_returns_zero_stats() {
        let session = session();
        session
            .receive_answer(crate::quiz::QuizAnswer::new(1, true))
            .await
            .unwrap();
        let routes = deck_routes(session.clone(), String::new());

        let resp = warp::test::request().method("POST").path("/deck/reset").reply(&routes).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(session.snapshot().await, QuizStats::new(10));
    }

    #[tokio::test]
    async fn test_student_socket_receives_initial_messages() {
        let routes = deck_routes(session(), String::new());
        let mut client = warp::test::ws()
            .path("/peer/tcu-deck-AB12")
            .handshake(routes)
            .await
            .expect("handshake");

        let first = client.recv().await.unwrap();
        let first: serde_json::Value = serde_json::from_str(first.to_str().unwrap()).unwrap();
        assert_eq!(first["type"], "stats_update");

        let second = client.recv().await.unwrap();
        let second: serde_json::Value = serde_json::from_str(second.to_str().unwrap()).unwrap();
        assert_eq!(second["type"], "quiz_config");
        assert_eq!(second["payload"]["1"], "B");
    }

    #[tokio::test]
    async fn test_view_socket_pushes_changes() {
        let session = session();
        let routes = deck_routes(session.clone(), String::new());
        let mut view = warp::test::ws()
            .path("/deck/view")
            .handshake(routes)
            .await
            .expect("handshake");

        let first = recv_json(&mut view).await;
        assert_eq!(first["key"], "class_quiz_results");
        assert_eq!(first["value"]["total"]["correct"], 0);
        let second = recv_json(&mut view).await;
        assert_eq!(second["key"], "class_thoughts");
        assert_eq!(second["value"], serde_json::json!([]));

        session
            .receive_answer(crate::quiz::QuizAnswer::new(1, true))
            .await
            .unwrap();

        let changed = recv_json(&mut view).await;
        assert_eq!(changed["key"], "class_quiz_results");
        assert_eq!(changed["value"]["total"]["correct"], 1);
        assert_eq!(changed["value"]["q1"]["correct"], 1);
    }

    #[tokio::test]
    async fn test_wrong_room_rejected() {
        let routes = deck_routes(session(), String::new());
        let result = warp::test::ws()
            .path("/peer/tcu-deck-ZZ99")
            .handshake(routes)
            .await;
        assert!(result.is_err());
    }
}
