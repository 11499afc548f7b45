//! Shared harness for the router-level tests.

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;

use words_weave_back::{
    config::AppConfig,
    dao::{
        generator::{GenerationError, GenerationEvent, GenerationResult, TextGenerator},
        snapshot_store::memory::MemorySnapshotStore,
    },
    routes,
    services::challenge_source::{ChallengeSource, SourceError},
    state::{AppState, SharedState, challenge::Catalog, challenge::Challenge},
};

pub const FIRST_SEED: &str = "The weather was calm today.";
pub const SECOND_SEED: &str = "Night falls over the calm forest.";

/// Two challenges with short quotes that are easy to reveal in one reply.
pub fn challenges() -> Vec<Challenge> {
    vec![
        Challenge::new("Zebras yawn quietly", "Ann Example", FIRST_SEED).unwrap(),
        Challenge::new("Owls hoot loudly", "Bob Example", SECOND_SEED).unwrap(),
    ]
}

/// What the scripted generator does on its next call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these fragments, then complete with their concatenation.
    Text(Vec<&'static str>),
    /// Fail before producing anything.
    Fail,
    /// Produce one fragment and never finish.
    Hang(&'static str),
    /// Produce one fragment, then fail.
    FailAfter(&'static str),
    /// Skip fragments and only report the completed text.
    FinalOnly(&'static str),
    /// Produce one fragment and complete with it once [`ScriptedGenerator::release`] is called.
    Held(&'static str),
}

/// Generator double replaying whatever [`Reply`] was set last.
pub struct ScriptedGenerator {
    reply: Mutex<Reply>,
    gate: Arc<Notify>,
}

impl ScriptedGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            gate: Arc::new(Notify::new()),
        }
    }

    pub fn set(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Let a [`Reply::Held`] stream complete.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl TextGenerator for ScriptedGenerator {
    fn stream(&self, _input: String) -> BoxStream<'static, GenerationResult<GenerationEvent>> {
        match self.reply.lock().unwrap().clone() {
            Reply::Text(fragments) => {
                let full = fragments.concat();
                let mut items: Vec<GenerationResult<GenerationEvent>> = fragments
                    .into_iter()
                    .map(|fragment| Ok(GenerationEvent::Fragment(fragment.to_owned())))
                    .collect();
                items.push(Ok(GenerationEvent::Completed(full)));
                stream::iter(items).boxed()
            }
            Reply::Fail => stream::iter(vec![Err(GenerationError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "upstream down".into(),
            })])
            .boxed(),
            Reply::Hang(first) => stream::iter(vec![Ok(GenerationEvent::Fragment(first.to_owned()))])
                .chain(stream::pending())
                .boxed(),
            Reply::FailAfter(first) => stream::iter(vec![
                Ok(GenerationEvent::Fragment(first.to_owned())),
                Err(GenerationError::Empty),
            ])
            .boxed(),
            Reply::FinalOnly(text) => {
                stream::iter(vec![Ok(GenerationEvent::Completed(text.to_owned()))]).boxed()
            }
            Reply::Held(first) => {
                let gate = self.gate.clone();
                stream::iter(vec![Ok(GenerationEvent::Fragment(first.to_owned()))])
                    .chain(stream::once(async move {
                        gate.notified().await;
                        Ok(GenerationEvent::Completed(first.to_owned()))
                    }))
                    .boxed()
            }
        }
    }

    fn complete(&self, _prompt: String) -> BoxFuture<'static, GenerationResult<String>> {
        async { Ok("A generated seed paragraph.".to_owned()) }.boxed()
    }
}

/// Pauses a [`FixedSource`] fetch until released.
#[derive(Default)]
pub struct FetchGate {
    /// Signalled once a fetch is waiting on the gate.
    pub entered: Notify,
    /// Lets the waiting fetch return.
    pub release: Notify,
}

/// Challenge source returning [`challenges`], or failing when `broken`.
pub struct FixedSource {
    pub broken: bool,
    pub gate: Option<Arc<FetchGate>>,
}

impl ChallengeSource for FixedSource {
    fn fetch(&self, count: usize) -> BoxFuture<'static, Result<Vec<Challenge>, SourceError>> {
        let broken = self.broken;
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            if broken {
                return Err(SourceError::NotEnough {
                    wanted: count,
                    found: 0,
                });
            }
            Ok(challenges().into_iter().take(count).collect())
        }
        .boxed()
    }
}

/// Fully wired application backed by test doubles.
pub struct TestApp {
    pub state: SharedState,
    pub router: Router,
    pub generator: Arc<ScriptedGenerator>,
    pub store: MemorySnapshotStore,
    pub source_gate: Arc<FetchGate>,
}

pub struct Options {
    pub max_attempts: usize,
    pub with_store: bool,
    pub broken_source: bool,
    pub gated_source: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            with_store: true,
            broken_source: false,
            gated_source: false,
        }
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(Options::default()).await
    }

    pub async fn with_options(options: Options) -> Self {
        let mut config = AppConfig::default();
        config.daily_challenges = 2;
        config.max_attempts = options.max_attempts;
        config.cooldown = Duration::ZERO;

        let generator = Arc::new(ScriptedGenerator::new(Reply::Text(vec!["Calm ", "weather."])));
        let catalog = Catalog::new(2, challenges()).unwrap();
        let source_gate = Arc::new(FetchGate::default());
        let source = Arc::new(FixedSource {
            broken: options.broken_source,
            gate: options.gated_source.then(|| source_gate.clone()),
        });
        let state = AppState::new(config, catalog, generator.clone(), source);

        let store = MemorySnapshotStore::new();
        if options.with_store {
            state.set_snapshot_store(Arc::new(store.clone())).await;
        }

        Self {
            router: routes::router(state.clone()),
            state,
            generator,
            store,
            source_gate,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// `GET /game`, returning the status, the minted session id and the JSON body.
    pub async fn get_game(&self, session: Option<&str>, query: &str) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().uri(format!("/game{query}"));
        if let Some(id) = session {
            builder = builder.header(header::COOKIE, format!("session={id}"));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        let status = response.status();
        let minted = minted_session(&response);
        (status, minted, json_body(response).await)
    }

    /// Start a fresh session and return its id.
    pub async fn new_session(&self) -> String {
        let (status, minted, _) = self.get_game(None, "").await;
        assert_eq!(status, StatusCode::OK);
        minted.expect("a session cookie is minted")
    }

    pub async fn post_raw(&self, session: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/game")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = session {
            builder = builder.header(header::COOKIE, format!("session={id}"));
        }
        self.send(builder.body(Body::from(body.to_owned())).unwrap()).await
    }

    pub async fn guess(&self, session: &str, input: &str) -> Response {
        let body = serde_json::json!({ "input": input }).to_string();
        self.post_raw(Some(session), &body).await
    }

    pub async fn next(&self, session: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::POST).uri("/game/next");
        if let Some(id) = session {
            builder = builder.header(header::COOKIE, format!("session={id}"));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    /// Wait until the session is no longer marked in flight.
    pub async fn wait_released(&self, session: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let busy = self
                    .state
                    .sessions()
                    .get(session)
                    .is_some_and(|session| session.in_flight());
                if !busy {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("in-flight claim released");
    }
}

pub fn minted_session(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .and_then(|pair| pair.strip_prefix("session="))
        .map(str::to_owned)
}

pub async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
