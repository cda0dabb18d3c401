use actdraw::cascade::SourceCascade;
use actdraw::config::AppConfig;
use actdraw::dispenser::{DispenseError, Dispenser};
use actdraw::pool::{PoolAssembler, POOL_SIZE};
use actdraw::protocol::{ClientMessage, ServerMessage};
use actdraw::providers::{ContentProvider, FetchHint, ProviderError, ProviderResult};
use actdraw::state::{AppState, AssemblerFactory};
use actdraw::types::{Challenge, ContentKind};
use actdraw::ws::handlers::handle_message;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Provider that plays back scripted batches, repeating the last one
struct ScriptedProvider {
    name: &'static str,
    kind: ContentKind,
    batches: Vec<Option<Vec<Challenge>>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn new(name: &'static str, kind: ContentKind, batches: Vec<Option<Vec<Challenge>>>) -> Self {
        Self {
            name,
            kind,
            batches,
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    async fn fetch(&mut self, _hint: FetchHint) -> ProviderResult<Vec<Challenge>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.batches.get(call.min(self.batches.len().saturating_sub(1))) {
            Some(Some(items)) => Ok(items.clone()),
            Some(None) => Err(ProviderError::Status(503)),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }
}

fn titles(prefix: &str, n: usize) -> Vec<Challenge> {
    (0..n)
        .map(|i| Challenge::film(format!("{} {}", prefix, i), "Popular"))
        .collect()
}

fn film_assembler(providers: Vec<ScriptedProvider>, pool_size: usize) -> PoolAssembler {
    let mut builder = SourceCascade::builder(ContentKind::Film, pool_size);
    for provider in providers {
        builder = builder.provider(Box::new(provider));
    }
    PoolAssembler::new(vec![builder.build()], pool_size)
}

fn state_with(factory: AssemblerFactory) -> Arc<AppState> {
    Arc::new(AppState::with_factory(AppConfig::default(), factory))
}

/// Fifty films from a healthy upstream, fresh per session
fn healthy_state() -> Arc<AppState> {
    state_with(Arc::new(|| {
        film_assembler(
            vec![ScriptedProvider::new(
                "healthy",
                ContentKind::Film,
                vec![Some(titles("Film", POOL_SIZE))],
            )],
            POOL_SIZE,
        )
    }))
}

#[tokio::test]
async fn test_cascade_short_circuit() {
    let p1 = ScriptedProvider::new("p1", ContentKind::Film, vec![Some(titles("One", 5))]);
    let p2 = ScriptedProvider::new("p2", ContentKind::Film, vec![Some(titles("Two", 5))]);
    let p2_calls = p2.calls.clone();

    let mut cascade = SourceCascade::builder(ContentKind::Film, POOL_SIZE)
        .provider(Box::new(p1))
        .provider(Box::new(p2))
        .build();
    let items = cascade.resolve(FetchHint::Primary).await;
    assert!(items.iter().all(|c| c.title.starts_with("One")));
    assert_eq!(p2_calls.load(Ordering::SeqCst), 0);

    // P1 empty, P2 non-empty: backup is never reached
    let p1 = ScriptedProvider::new("p1", ContentKind::Film, vec![Some(vec![])]);
    let p2 = ScriptedProvider::new("p2", ContentKind::Film, vec![Some(titles("Two", 5))]);
    let mut cascade = SourceCascade::builder(ContentKind::Film, POOL_SIZE)
        .provider(Box::new(p1))
        .provider(Box::new(p2))
        .build();
    let items = cascade.resolve(FetchHint::Primary).await;
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|c| c.provenance.is_none()));
}

#[tokio::test]
async fn test_all_providers_down() {
    let films = SourceCascade::builder(ContentKind::Film, POOL_SIZE)
        .provider(Box::new(ScriptedProvider::new("tmdb", ContentKind::Film, vec![None])))
        .provider(Box::new(ScriptedProvider::new("omdb", ContentKind::Film, vec![Some(vec![])])))
        .build();
    let tv = SourceCascade::builder(ContentKind::TvShow, POOL_SIZE)
        .provider(Box::new(ScriptedProvider::new("tvmaze", ContentKind::TvShow, vec![None])))
        .build();
    let mut assembler = PoolAssembler::new(vec![films, tv], POOL_SIZE);

    let pool = assembler.assemble().await;
    assert_eq!(pool.len(), POOL_SIZE);
    let keys: HashSet<_> = pool.iter().map(|c| c.key()).collect();
    assert_eq!(keys.len(), POOL_SIZE, "duplicate titles in backup pool");
    assert!(pool
        .iter()
        .all(|c| c.provenance.as_deref().is_some_and(|p| p.starts_with("Backup"))));
}

#[tokio::test]
async fn test_first_provider_with_exactly_fifty() {
    let items = titles("Exact", POOL_SIZE);
    let mut assembler = film_assembler(
        vec![ScriptedProvider::new("p1", ContentKind::Film, vec![Some(items.clone())])],
        POOL_SIZE,
    );
    let pool = assembler.assemble().await;
    let got: HashSet<_> = pool.into_iter().map(|c| c.title).collect();
    let want: HashSet<_> = items.into_iter().map(|c| c.title).collect();
    assert_eq!(got, want);
}

#[tokio::test]
async fn test_pool_of_three_with_four_calls() {
    let provider = ScriptedProvider::new(
        "p1",
        ContentKind::Film,
        vec![Some(titles("Old", 3)), Some(titles("New", 3))],
    );
    let calls = provider.calls.clone();
    let mut dispenser = Dispenser::new(film_assembler(vec![provider], 3));
    dispenser.prime().await;

    let mut first = HashSet::new();
    for _ in 0..3 {
        first.insert(dispenser.next().await.unwrap().challenge.title);
    }
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|t| t.starts_with("Old")));

    let fourth = dispenser.next().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(fourth.challenge.title.starts_with("New"));
    assert_eq!(dispenser.dispensed_titles().len(), 1);
    assert_eq!(dispenser.refill_count(), 1);
}

#[tokio::test]
async fn test_session_flow_over_messages() {
    let state = healthy_state();
    let session = state.create_session().await;
    let stats = session.prime().await;
    assert_eq!(stats.total, POOL_SIZE);
    let (tx, _rx) = mpsc::unbounded_channel();

    // Timer needs a challenge first
    match handle_message(ClientMessage::StartRound, &session, &tx).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NO_CURRENT_CHALLENGE"),
        other => panic!("Expected error, got {:?}", other),
    }

    let mut seen = HashSet::new();
    for i in 0..POOL_SIZE {
        match handle_message(ClientMessage::NextChallenge, &session, &tx).await {
            Some(ServerMessage::Challenge { challenge, stats, .. }) => {
                assert!(seen.insert(challenge.title), "repeat on call {}", i + 1);
                assert_eq!(stats.used, i + 1);
            }
            other => panic!("Expected Challenge, got {:?}", other),
        }
    }
    assert_eq!(session.refill_count().await, 0);

    // Exhausted: the next call refills and starts over
    match handle_message(ClientMessage::NextChallenge, &session, &tx).await {
        Some(ServerMessage::Challenge { stats, .. }) => assert_eq!(stats.used, 1),
        other => panic!("Expected Challenge, got {:?}", other),
    }
    assert_eq!(session.refill_count().await, 1);

    match handle_message(ClientMessage::StartRound, &session, &tx).await {
        Some(ServerMessage::RoundStarted { seconds }) => assert_eq!(seconds, 60),
        other => panic!("Expected RoundStarted, got {:?}", other),
    }
    assert!(matches!(
        handle_message(ClientMessage::StopRound, &session, &tx).await,
        Some(ServerMessage::RoundStopped)
    ));
    assert!(matches!(
        handle_message(ClientMessage::Ping, &session, &tx).await,
        Some(ServerMessage::Pong)
    ));
}

#[tokio::test]
async fn test_refill_sends_loading_notices() {
    let state = state_with(Arc::new(|| {
        film_assembler(
            vec![ScriptedProvider::new("p1", ContentKind::Film, vec![Some(titles("Film", 1))])],
            1,
        )
    }));
    let session = state.create_session().await;
    session.prime().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    handle_message(ClientMessage::NextChallenge, &session, &tx).await;
    assert!(rx.try_recv().is_err());

    handle_message(ClientMessage::NextChallenge, &session, &tx).await;
    assert!(matches!(rx.try_recv(), Ok(ServerMessage::Loading { loading: true })));
    assert!(matches!(rx.try_recv(), Ok(ServerMessage::Loading { loading: false })));
}

/// One film per pool, each assembly taking two seconds
fn slow_state() -> Arc<AppState> {
    state_with(Arc::new(|| {
        film_assembler(
            vec![
                ScriptedProvider::new("slow", ContentKind::Film, vec![Some(titles("Film", 1))])
                    .with_delay(Duration::from_secs(2)),
            ],
            1,
        )
    }))
}

#[tokio::test(start_paused = true)]
async fn test_slow_refill_announced_before_challenge() {
    let session = slow_state().create_session().await;
    session.prime().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    handle_message(ClientMessage::NextChallenge, &session, &tx).await;

    let draw = {
        let session = session.clone();
        let tx = tx.clone();
        tokio::spawn(async move { handle_message(ClientMessage::NextChallenge, &session, &tx).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(rx.try_recv(), Ok(ServerMessage::Loading { loading: true })));
    assert!(rx.try_recv().is_err());

    assert!(matches!(draw.await.unwrap(), Some(ServerMessage::Challenge { .. })));
    assert!(matches!(rx.try_recv(), Ok(ServerMessage::Loading { loading: false })));
}

#[tokio::test]
async fn test_no_challenges_error() {
    // A zero-sized pool cannot hold anything, not even backup titles
    let state = state_with(Arc::new(|| film_assembler(vec![], 0)));
    let session = state.create_session().await;
    session.prime().await;
    let (tx, _rx) = mpsc::unbounded_channel();

    match handle_message(ClientMessage::NextChallenge, &session, &tx).await {
        Some(ServerMessage::Error { code, msg }) => {
            assert_eq!(code, "NO_CHALLENGES");
            assert_eq!(msg, DispenseError::NoChallengesAvailable.to_string());
        }
        other => panic!("Expected NO_CHALLENGES error, got {:?}", other),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_http_session_api() {
    let state = healthy_state();
    let app = actdraw::api::router().with_state(state.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "OK");

    let response = app
        .clone()
        .oneshot(Request::post("/api/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["stats"]["total"], POOL_SIZE);

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/api/sessions/{}/next", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let next = body_json(response).await;
    assert_eq!(next["challenge"]["kind"], "FILM");
    assert!(["ACT", "DRAW"].contains(&next["mode"].as_str().unwrap()));

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/sessions/{}/stats", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["used"], 1);
    assert_eq!(stats["loading"], false);

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/api/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::post(format!("/api/sessions/{}/next", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test(start_paused = true)]
async fn test_http_stats_report_loading_during_refill() {
    let app = actdraw::api::router().with_state(slow_state());
    let post = |uri: String| Request::post(uri).body(Body::empty()).unwrap();
    let get = |uri: String| Request::get(uri).body(Body::empty()).unwrap();

    let response = app.clone().oneshot(post("/api/sessions".to_string())).await.unwrap();
    let id = body_json(response).await["session_id"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(post(format!("/api/sessions/{}/next", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The pool is spent, so this draw waits on a two second refill
    let refill = tokio::spawn(app.clone().oneshot(post(format!("/api/sessions/{}/next", id))));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = app
        .clone()
        .oneshot(get(format!("/api/sessions/{}/stats", id)))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["loading"], true);
    assert_eq!(stats["remaining"], 0);

    assert_eq!(refill.await.unwrap().unwrap().status(), StatusCode::OK);
    let response = app
        .oneshot(get(format!("/api/sessions/{}/stats", id)))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["loading"], false);
    assert_eq!(stats["used"], 1);
}

#[tokio::test]
async fn test_http_provider_health() {
    let app = actdraw::api::router().with_state(healthy_state());
    let response = app
        .oneshot(
            Request::get("/api/providers/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report[0]["name"], "healthy");
    assert_eq!(report[0]["ok"], true);
}
