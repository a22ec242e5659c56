use super::cache::LibraryCache;
use super::filters::{eligible, Filter, FilterSet};
use super::selection::{Phase, Presenter, SelectionEngine, SelectionState};
use super::{WheelSettings, ENTRY_ROUTE};
use crate::error::{ClientError, SelectionError};
use crate::models::Item;
use async_trait::async_trait;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::watch;

/// Checks that the ambient session may access the library.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn validate_session(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    /// Leave the wheel for this route (pairing, server selection, ...).
    Redirect(&'static str),
}

/// Ties the session check, library cache, filters and selection engine
/// together the way the wheel page uses them.
pub struct WheelApp {
    validator: Arc<dyn SessionValidator>,
    cache: LibraryCache,
    presenter: Arc<dyn Presenter>,
    settings: WheelSettings,
    filters: FilterSet,
    items: Vec<Item>,
    engine: SelectionEngine,
}

impl WheelApp {
    pub fn new(
        validator: Arc<dyn SessionValidator>,
        cache: LibraryCache,
        presenter: Arc<dyn Presenter>,
        settings: WheelSettings,
    ) -> Self {
        let engine = SelectionEngine::new(&settings);
        Self {
            validator,
            cache,
            presenter,
            settings,
            filters: FilterSet::new(),
            items: Vec::new(),
            engine,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.engine = self.engine.with_rng(rng);
        self
    }

    /// Validate the session and load the library. Any failure sends the user
    /// back to the entry route; nothing is retried.
    pub async fn load(&mut self) -> Navigation {
        if let Err(e) = self.validator.validate_session().await {
            tracing::warn!("Session rejected ({}), redirecting to {}", e, ENTRY_ROUTE);
            return Navigation::Redirect(ENTRY_ROUTE);
        }

        let items = match self.cache.get_library().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Library unavailable ({}), redirecting to {}", e, ENTRY_ROUTE);
                return Navigation::Redirect(ENTRY_ROUTE);
            }
        };

        tracing::info!("Library loaded with {} items", items.len());
        self.items = items;

        if self.engine.phase() == Phase::Loading {
            if let Err(e) = self.engine.items_arrived() {
                tracing::warn!("Unexpected state after loading library: {}", e);
            }
        }

        Navigation::Stay
    }

    /// Forget the cached library; the next `load` fetches a fresh one.
    pub fn clear_cache(&self) -> Result<(), ClientError> {
        self.cache.clear()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn set_filter(&mut self, filter: Filter, enabled: bool) {
        self.filters.set(filter, enabled);
    }

    pub fn toggle_filter(&mut self, filter: Filter) -> bool {
        let enabled = self.filters.toggle(filter);
        tracing::debug!("Filter {} {}", filter.name(), if enabled { "on" } else { "off" });
        enabled
    }

    pub fn eligible(&self) -> Vec<Item> {
        eligible(&self.items, &self.filters)
    }

    pub fn can_spin(&self) -> bool {
        self.engine.can_spin(&self.eligible())
    }

    pub fn state(&self) -> &SelectionState {
        self.engine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.engine.subscribe()
    }

    /// Spin (or spin again), play the presentation and reveal the winner.
    ///
    /// There is no cancel: dropping the returned future mid-presentation
    /// leaves the engine spinning.
    pub async fn spin(&mut self) -> Result<Item, SelectionError> {
        let eligible = self.eligible();
        let committed = if self.engine.phase() == Phase::Done {
            self.engine.spin_again(&eligible)
        } else {
            self.engine.spin(&eligible)
        };
        let spin = committed?.clone();

        let shown = self.presenter.present(&spin, self.settings.song_length).await;
        if shown != *spin.winner() {
            tracing::warn!(
                "Presenter landed on '{}' but '{}' was committed",
                shown.title,
                spin.winner().title
            );
        }

        self.engine.reveal()
    }

    pub fn reset(&mut self) -> Result<(), SelectionError> {
        self.engine.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheel::cache::LibrarySource;
    use crate::wheel::selection::Spin;
    use crate::wheel::storage::MemoryStore;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeValidator {
        ok: bool,
    }

    #[async_trait]
    impl SessionValidator for FakeValidator {
        async fn validate_session(&self) -> Result<(), ClientError> {
            if self.ok {
                Ok(())
            } else {
                Err(ClientError::Status(401))
            }
        }
    }

    struct FakeSource {
        items: Option<Vec<Item>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LibrarySource for FakeSource {
        async fn fetch_library(&self) -> Result<Vec<Item>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.items.clone().ok_or(ClientError::Status(502))
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Mutex<Vec<(usize, Duration)>>,
    }

    #[async_trait]
    impl Presenter for RecordingPresenter {
        async fn present(&self, spin: &Spin, duration: Duration) -> Item {
            self.shown.lock().unwrap().push((spin.segments.len(), duration));
            spin.winner().clone()
        }
    }

    struct Harness {
        app: WheelApp,
        source: Arc<FakeSource>,
        presenter: Arc<RecordingPresenter>,
    }

    fn harness(session_ok: bool, items: Option<Vec<Item>>) -> Harness {
        let source = Arc::new(FakeSource {
            items,
            calls: AtomicUsize::new(0),
        });
        let presenter = Arc::new(RecordingPresenter::default());
        let cache = LibraryCache::new(Arc::new(MemoryStore::new()), source.clone());
        let settings = WheelSettings {
            song_length: Duration::from_millis(5),
            ..WheelSettings::default()
        };
        let app = WheelApp::new(
            Arc::new(FakeValidator { ok: session_ok }),
            cache,
            presenter.clone(),
            settings,
        )
        .with_rng(StdRng::seed_from_u64(42));

        Harness {
            app,
            source,
            presenter,
        }
    }

    fn library() -> Vec<Item> {
        vec![
            Item::new("A").with_critic_rating(2.0),
            Item::new("B").with_critic_rating(8.0),
            Item::new("C"),
        ]
    }

    #[tokio::test]
    async fn test_invalid_session_redirects_before_library_access() {
        let mut h = harness(false, Some(library()));

        assert_eq!(h.app.load().await, Navigation::Redirect("/"));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.app.state().phase, Phase::Loading);
        assert!(!h.app.can_spin());
    }

    #[tokio::test]
    async fn test_failed_listing_redirects() {
        let mut h = harness(true, None);

        assert_eq!(h.app.load().await, Navigation::Redirect("/"));
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
        assert!(h.app.items().is_empty());
        assert_eq!(h.app.state().phase, Phase::Loading);
    }

    #[tokio::test]
    async fn test_load_then_spin_filtered() {
        let mut h = harness(true, Some(library()));

        assert_eq!(h.app.load().await, Navigation::Stay);
        assert_eq!(h.app.state().phase, Phase::Ready);

        h.app.toggle_filter(Filter::BadCritic);
        assert_eq!(h.app.eligible(), vec![library()[0].clone()]);

        let winner = h.app.spin().await.unwrap();
        assert_eq!(winner.title, "A");
        assert_eq!(h.app.state().phase, Phase::Done);
        assert_eq!(h.app.state().winner.as_ref(), Some(&winner));
        assert_eq!(
            *h.presenter.shown.lock().unwrap(),
            vec![(1, Duration::from_millis(5))]
        );
    }

    #[tokio::test]
    async fn test_spin_again_and_reset() {
        let mut h = harness(true, Some(library()));
        h.app.load().await;

        h.app.spin().await.unwrap();
        h.app.spin().await.unwrap();
        assert_eq!(h.presenter.shown.lock().unwrap().len(), 2);
        assert_eq!(h.app.state().phase, Phase::Done);

        h.app.reset().unwrap();
        assert_eq!(h.app.state().phase, Phase::Ready);
        assert!(h.app.state().winner.is_none());
    }

    #[tokio::test]
    async fn test_nothing_eligible_cannot_spin() {
        let mut h = harness(true, Some(library()));
        h.app.load().await;

        h.app.set_filter(Filter::Disparity, true);
        assert!(h.app.eligible().is_empty());
        assert!(!h.app.can_spin());
        assert_eq!(h.app.spin().await.unwrap_err(), SelectionError::NoEligibleItems);
        assert_eq!(h.app.state().phase, Phase::Ready);
        assert!(h.presenter.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reload_uses_cache() {
        let mut h = harness(true, Some(library()));

        h.app.load().await;
        h.app.load().await;
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.app.state().phase, Phase::Ready);

        h.app.clear_cache().unwrap();
        h.app.load().await;
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 2);
    }
}
