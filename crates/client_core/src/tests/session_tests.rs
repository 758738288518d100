use super::*;
use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Notify};

struct TestProfileSource {
    profile: Option<Profile>,
    calls: AtomicUsize,
}

impl TestProfileSource {
    fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            profile: Some(Profile::with_name(name)),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            profile: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for TestProfileSource {
    async fn fetch_profile(&self, _token: &str) -> Result<Profile, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profile.clone().ok_or(GatewayError::Server {
            status: 503,
            message: None,
        })
    }
}

/// Holds each fetch until its own gate is released, so tests can interleave
/// mutations and choose the completion order. Call `n` resolves to a profile
/// named `fetch-n` and reports its index on `started` when it begins.
struct GatedProfileSource {
    calls: AtomicUsize,
    started: mpsc::UnboundedSender<usize>,
    gates: [Notify; 2],
}

impl GatedProfileSource {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<usize>) {
        let (started, started_rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            calls: AtomicUsize::new(0),
            started,
            gates: [Notify::new(), Notify::new()],
        });
        (source, started_rx)
    }

    fn release(&self, call: usize) {
        self.gates[call].notify_one();
    }
}

#[async_trait]
impl ProfileSource for GatedProfileSource {
    async fn fetch_profile(&self, _token: &str) -> Result<Profile, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.send(call);
        self.gates[call].notified().await;
        Ok(Profile::with_name(format!("fetch-{call}")))
    }
}

fn spawn_refresh(store: &Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    let store = Arc::clone(store);
    tokio::spawn(async move { store.refresh_profile().await })
}

struct BrokenTokenStore;

#[async_trait]
impl TokenStore for BrokenTokenStore {
    async fn load(&self) -> Result<Option<String>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn save(&self, _token: &str) -> Result<()> {
        Err(anyhow!("disk unavailable"))
    }

    async fn clear(&self) -> Result<()> {
        Err(anyhow!("disk unavailable"))
    }
}

#[tokio::test]
async fn login_sets_profile_without_fetching() {
    let source = TestProfileSource::ok("fetched");
    let tokens = Arc::new(MemoryTokenStore::default());
    let store = SessionStore::new(tokens.clone(), source.clone());

    store.login("tok1", Profile::with_name("A")).await;

    let session = store.snapshot().await;
    assert_eq!(session.token.as_deref(), Some("tok1"));
    assert_eq!(session.profile.as_ref().and_then(Profile::name), Some("A"));
    assert!(!session.loading);
    assert_eq!(source.calls(), 0);
    assert_eq!(tokens.load().await.unwrap().as_deref(), Some("tok1"));
}

#[tokio::test]
async fn logout_then_refresh_leaves_everything_absent() {
    let source = TestProfileSource::ok("fetched");
    let tokens = Arc::new(MemoryTokenStore::default());
    let store = SessionStore::new(tokens.clone(), source.clone());
    store.login("tok1", Profile::with_name("A")).await;

    store.logout().await;
    store.refresh_profile().await;

    let session = store.snapshot().await;
    assert_eq!(session.token, None);
    assert_eq!(session.profile, None);
    assert_eq!(source.calls(), 0);
    assert_eq!(tokens.load().await.unwrap(), None);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let store = SessionStore::new(
        Arc::new(MemoryTokenStore::with_token("tok1")),
        TestProfileSource::ok("x"),
    );
    store.logout().await;
    store.logout().await;
    assert_eq!(store.snapshot().await, Session::default());
}

#[tokio::test]
async fn refresh_replaces_profile_wholesale_on_success() {
    let source = TestProfileSource::ok("fetched");
    let store = SessionStore::new(Arc::new(MemoryTokenStore::default()), source.clone());
    store.login("tok1", Profile::with_name("A")).await;

    store.refresh_profile().await;

    let profile = store.profile().await.expect("profile");
    assert_eq!(profile.name(), Some("fetched"));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_token_but_clears_profile() {
    let store = SessionStore::new(
        Arc::new(MemoryTokenStore::default()),
        TestProfileSource::failing(),
    );
    store.login("tok1", Profile::with_name("A")).await;

    store.refresh_profile().await;

    let session = store.snapshot().await;
    assert_eq!(session.token.as_deref(), Some("tok1"));
    assert_eq!(session.profile, None);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn restore_reads_persisted_token_and_fetches_profile() {
    let source = TestProfileSource::ok("restored");
    let store = SessionStore::new(Arc::new(MemoryTokenStore::with_token("saved")), source.clone());

    let session = store.restore().await;

    assert_eq!(session.token.as_deref(), Some("saved"));
    assert_eq!(session.profile.as_ref().and_then(Profile::name), Some("restored"));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn restore_without_token_skips_fetch() {
    let source = TestProfileSource::ok("unused");
    let store = SessionStore::new(Arc::new(MemoryTokenStore::default()), source.clone());

    let session = store.restore().await;

    assert_eq!(session, Session::default());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn login_survives_persistence_failure() {
    let store = SessionStore::new(Arc::new(BrokenTokenStore), TestProfileSource::ok("x"));

    let restored = store.restore().await;
    assert_eq!(restored.token, None);

    store.login("tok1", Profile::with_name("A")).await;
    assert!(store.is_authenticated().await);
    assert_eq!(store.token().await.as_deref(), Some("tok1"));

    store.logout().await;
    assert!(!store.is_authenticated().await);
}

#[tokio::test]
async fn refresh_result_is_dropped_when_logged_out_mid_fetch() {
    let (source, mut started) = GatedProfileSource::new();
    let store = Arc::new(SessionStore::new(
        Arc::new(MemoryTokenStore::default()),
        source.clone(),
    ));
    store.login("tok1", Profile::with_name("A")).await;

    let refresh = spawn_refresh(&store);
    assert_eq!(started.recv().await, Some(0));
    assert!(store.snapshot().await.loading);

    store.logout().await;
    source.release(0);
    refresh.await.expect("refresh task");

    let session = store.snapshot().await;
    assert_eq!(session.token, None);
    assert_eq!(session.profile, None);
    assert!(!session.loading);
}

#[tokio::test]
async fn overlapping_refreshes_keep_the_later_completion() {
    let (source, mut started) = GatedProfileSource::new();
    let store = Arc::new(SessionStore::new(
        Arc::new(MemoryTokenStore::default()),
        source.clone(),
    ));
    store.login("tok1", Profile::with_name("A")).await;

    let first = spawn_refresh(&store);
    assert_eq!(started.recv().await, Some(0));
    let second = spawn_refresh(&store);
    assert_eq!(started.recv().await, Some(1));
    assert!(store.snapshot().await.loading);

    source.release(1);
    second.await.expect("second refresh");
    let midway = store.snapshot().await;
    assert_eq!(midway.profile.as_ref().and_then(Profile::name), Some("fetch-1"));
    assert!(midway.loading, "first refresh is still outstanding");

    source.release(0);
    first.await.expect("first refresh");
    let session = store.snapshot().await;
    assert_eq!(session.token.as_deref(), Some("tok1"));
    assert_eq!(session.profile.as_ref().and_then(Profile::name), Some("fetch-0"));
    assert!(!session.loading);
}

#[tokio::test]
async fn missing_profile_source_reports_not_configured() {
    let err = MissingProfileSource
        .fetch_profile("tok")
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::NotConfigured(_)));
}
