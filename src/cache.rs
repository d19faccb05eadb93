use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::schedule::{Schedule, schedule_end};
use crate::source::ScheduleSource;

type PendingFetch = Shared<BoxFuture<'static, Result<Arc<Schedule>>>>;

/// Holds the last fetched schedule and decides when it has to be fetched again.
///
/// A cached schedule is served for as long as the clock is before its end.
/// At most one fetch is in flight at a time; every caller that arrives while
/// it is outstanding awaits the same result. A failed fetch leaves the cached
/// schedule untouched and is not retried until the next call.
pub struct ScheduleCache {
    source: Arc<dyn ScheduleSource>,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    last: Option<Arc<Schedule>>,
    pending: Option<PendingFetch>,
}

impl ScheduleCache {
    pub fn new(source: Arc<dyn ScheduleSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            state: Mutex::default(),
        }
    }

    /// Last installed schedule, fresh or not, without fetching.
    pub fn cached(&self) -> Option<Arc<Schedule>> {
        self.lock().last.clone()
    }

    pub async fn get(&self) -> Result<Arc<Schedule>> {
        self.load("get").await
    }

    /// Same staleness rule as [`get`](Self::get), for callers that want to
    /// push the schedule forward (e.g. at the end of an entry).
    pub async fn refresh(&self) -> Result<Arc<Schedule>> {
        self.load("refresh").await
    }

    async fn load(&self, caller: &'static str) -> Result<Arc<Schedule>> {
        let pending = {
            let mut state = self.lock();
            if let Some(last) = state.last.as_ref().filter(|s| self.is_fresh(s)) {
                debug!(caller, "schedule cache hit");
                return Ok(Arc::clone(last));
            }
            match &state.pending {
                Some(pending) => {
                    debug!(caller, "joining in-flight schedule fetch");
                    pending.clone()
                }
                None => {
                    debug!(caller, "schedule stale or missing, fetching");
                    // Runs on its own task so it completes even if every
                    // waiter is dropped.
                    let source = Arc::clone(&self.source);
                    let task = tokio::spawn(async move { source.fetch().await.map(Arc::new) });
                    let fetch = async move {
                        task.await.unwrap_or_else(|err| Err(Error::fetch(err)))
                    }
                    .boxed()
                    .shared();
                    state.pending = Some(fetch.clone());
                    fetch
                }
            }
        };

        let result = pending.clone().await;

        let mut state = self.lock();
        if state.pending.as_ref().is_some_and(|p| p.ptr_eq(&pending)) {
            state.pending = None;
        }
        match result {
            Ok(fetched) => Ok(self.install(&mut state, fetched)),
            Err(err) => {
                warn!(caller, error = %err, "schedule fetch failed");
                Err(err)
            }
        }
    }

    /// Replaces the cached schedule unless a fresh one at least as far-reaching
    /// was installed while the fetch was outstanding.
    fn install(&self, state: &mut CacheState, fetched: Arc<Schedule>) -> Arc<Schedule> {
        if let Some(last) = &state.last {
            if Arc::ptr_eq(last, &fetched) {
                return fetched;
            }
            if self.is_fresh(last) && reaches_at_least(last, &fetched) {
                debug!("discarding outdated schedule fetch");
                return Arc::clone(last);
            }
        }
        match schedule_end(&fetched) {
            Ok(end) => info!(entries = fetched.entries.len(), %end, "schedule replaced"),
            Err(err) => warn!(error = %err, "installed schedule has no end"),
        }
        state.last = Some(Arc::clone(&fetched));
        fetched
    }

    fn is_fresh(&self, schedule: &Schedule) -> bool {
        schedule_end(schedule).is_ok_and(|end| self.clock.now() < end)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn reaches_at_least(current: &Schedule, other: &Schedule) -> bool {
    match (schedule_end(current), schedule_end(other)) {
        (Ok(current), Ok(other)) => current >= other,
        (Ok(_), Err(_)) => true,
        (Err(_), _) => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::clock::ManualClock;
    use crate::schedule::tests::{at, entry, two_entry_schedule};

    /// Serves queued responses (then `fallback`) and counts calls.
    pub(crate) struct FakeSource {
        pub(crate) calls: AtomicUsize,
        completed: AtomicUsize,
        responses: Mutex<VecDeque<Result<Schedule>>>,
        fallback: Schedule,
        delay: Duration,
    }

    impl FakeSource {
        pub(crate) fn new(fallback: Schedule) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                responses: Mutex::default(),
                fallback,
                delay: Duration::ZERO,
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn push(&self, response: Result<Schedule>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScheduleSource for FakeSource {
        async fn fetch(&self) -> Result<Schedule> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            let queued = self.responses.lock().unwrap().pop_front();
            queued.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn cache_at(offset: i64, source: &Arc<FakeSource>) -> (ScheduleCache, ManualClock) {
        let clock = ManualClock::new(at(offset));
        let cache = ScheduleCache::new(source.clone(), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[tokio::test]
    async fn test_get_serves_cached_schedule_until_end() {
        let source = Arc::new(FakeSource::new(two_entry_schedule()));
        let (cache, clock) = cache_at(100, &source);

        let first = cache.get().await.unwrap();
        clock.set(at(899));
        let second = cache.get().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_get_fetches_again_once_schedule_has_ended() {
        let source = Arc::new(FakeSource::new(two_entry_schedule()));
        let (cache, clock) = cache_at(100, &source);

        cache.get().await.unwrap();
        clock.set(at(900));
        cache.get().await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_fetch() {
        let source = Arc::new(
            FakeSource::new(two_entry_schedule()).with_delay(Duration::from_millis(20)),
        );
        let (cache, _clock) = cache_at(100, &source);

        let (a, b, c) = tokio::join!(cache.refresh(), cache.refresh(), cache.refresh());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert!(Arc::ptr_eq(&a, &cache.cached().unwrap()));
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_and_keeps_last_schedule() {
        let source = Arc::new(
            FakeSource::new(two_entry_schedule()).with_delay(Duration::from_millis(20)),
        );
        let (cache, clock) = cache_at(100, &source);
        let original = cache.get().await.unwrap();

        clock.set(at(1000));
        source.push(Err(Error::fetch("503 Service Unavailable")));
        let (a, b) = tokio::join!(cache.refresh(), cache.get());

        assert_eq!(a, Err(Error::fetch("503 Service Unavailable")));
        assert_eq!(b, Err(Error::fetch("503 Service Unavailable")));
        assert_eq!(source.calls(), 2);
        assert!(Arc::ptr_eq(&original, &cache.cached().unwrap()));

        // no poisoning: the next call retries from scratch
        cache.get().await.unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_completes_after_its_caller_is_dropped() {
        let source = Arc::new(
            FakeSource::new(two_entry_schedule()).with_delay(Duration::from_millis(20)),
        );
        let (cache, _clock) = cache_at(100, &source);

        let abandoned = tokio::time::timeout(Duration::from_millis(5), cache.refresh()).await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.completed.load(Ordering::SeqCst), 1);

        let schedule = cache.get().await.unwrap();
        assert_eq!(*schedule, two_entry_schedule());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_schedule_is_always_stale() {
        let source = Arc::new(FakeSource::new(Schedule::default()));
        let (cache, _clock) = cache_at(0, &source);

        assert!(cache.get().await.unwrap().entries.is_empty());
        cache.get().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_outdated_fetch_result_is_discarded() {
        let source = Arc::new(FakeSource::new(Schedule::default()));
        let (cache, _clock) = cache_at(100, &source);

        let newer = Arc::new(Schedule {
            entries: vec![entry("A", 0, 600), entry("B", 600, 600)],
        });
        let older = Arc::new(two_entry_schedule());

        let mut state = cache.lock();
        state.last = Some(newer.clone());
        let kept = cache.install(&mut state, older);
        assert!(Arc::ptr_eq(&kept, &newer));

        let longer = Arc::new(Schedule {
            entries: vec![entry("A", 0, 600), entry("C", 600, 3600)],
        });
        let installed = cache.install(&mut state, longer.clone());
        assert!(Arc::ptr_eq(&installed, &longer));
    }
}
