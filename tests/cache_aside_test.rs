//! End-to-end behaviour of the cache-aside read path over the in-memory backend

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cache_aside::domain::{
    Cache, DomainError, Loader, LogicalEnvelope, ReadStrategy, Shop, ShopId, ShopRepository,
};
use cache_aside::domain::cache::{decode_logical, encode_logical};
use cache_aside::infrastructure::cache::{
    DistributedLock, InMemoryCache, RebuildScheduler, RebuildSchedulerConfig,
};
use cache_aside::infrastructure::services::{
    CacheAsideClient, CacheAsideConfig, SHOP_CACHE_PREFIX, ShopService,
};
use cache_aside::infrastructure::shop::{InMemoryShopRepository, sample_shops};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_test::assert_ok;

const SHOP_PREFIX: &str = "shop:";
const SHOP_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CafeRecord {
    id: u64,
    name: String,
}

/// Store holding at most one record, counting every load
#[derive(Debug)]
struct SingleRecordStore {
    record: std::sync::Mutex<Option<CafeRecord>>,
    loads: AtomicUsize,
    delay: Duration,
}

impl SingleRecordStore {
    fn new(record: Option<CafeRecord>, delay: Duration) -> Self {
        Self {
            record: std::sync::Mutex::new(record),
            loads: AtomicUsize::new(0),
            delay,
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Loader<u64, CafeRecord> for SingleRecordStore {
    async fn load(&self, id: &u64) -> Result<Option<CafeRecord>, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        Ok(self
            .record
            .lock()
            .unwrap()
            .clone()
            .filter(|record| record.id == *id))
    }
}

fn cafe(name: &str) -> CafeRecord {
    CafeRecord {
        id: 1,
        name: name.to_string(),
    }
}

fn client(config: CacheAsideConfig) -> (Arc<dyn Cache>, CacheAsideClient) {
    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let scheduler = Arc::new(RebuildScheduler::new(
        RebuildSchedulerConfig::default().with_workers(4),
    ));
    let client = CacheAsideClient::with_config(cache.clone(), scheduler, config);
    (cache, client)
}

#[tokio::test]
async fn cold_pass_through_read_loads_once_and_caches_for_thirty_minutes() {
    let (cache, client) = client(CacheAsideConfig::default());
    let store = SingleRecordStore::new(Some(cafe("Cafe")), Duration::ZERO);

    let first: Option<CafeRecord> = client
        .read_pass_through(SHOP_PREFIX, &1u64, &store, SHOP_TTL)
        .await
        .unwrap();
    assert_eq!(first, Some(cafe("Cafe")));
    assert_eq!(store.loads(), 1);

    let raw = cache.get_raw("shop:1").await.unwrap().unwrap();
    assert_eq!(raw, r#"{"id":1,"name":"Cafe"}"#);
    let ttl = cache.ttl("shop:1").await.unwrap().unwrap();
    assert!(ttl > Duration::from_secs(29 * 60) && ttl <= SHOP_TTL);

    let second: Option<CafeRecord> = client
        .read_pass_through(SHOP_PREFIX, &1u64, &store, SHOP_TTL)
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(store.loads(), 1);
}

#[tokio::test]
async fn absent_key_is_negatively_cached() {
    let (_, client) = client(CacheAsideConfig::default());
    let store = SingleRecordStore::new(None, Duration::ZERO);

    for _ in 0..3 {
        let result: Option<CafeRecord> = client
            .read_pass_through(SHOP_PREFIX, &1u64, &store, SHOP_TTL)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    assert_eq!(store.loads(), 1);
}

#[tokio::test]
async fn logical_read_honours_negative_entry() {
    let (cache, client) = client(CacheAsideConfig::default());
    let store = Arc::new(SingleRecordStore::new(None, Duration::ZERO));

    let missing: Option<CafeRecord> = client
        .read_pass_through(SHOP_PREFIX, &1u64, store.as_ref(), SHOP_TTL)
        .await
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(store.loads(), 1);

    let logical: Option<CafeRecord> = client
        .read_with_logical_expire(SHOP_PREFIX, 1u64, store.clone(), Duration::from_secs(20))
        .await
        .unwrap();
    assert!(logical.is_none());
    client.scheduler().wait_idle().await;
    assert_eq!(store.loads(), 1);
    assert_eq!(cache.get_raw("shop:1").await.unwrap(), Some(String::new()));

    let again: Option<CafeRecord> = client
        .read_pass_through(SHOP_PREFIX, &1u64, store.as_ref(), SHOP_TTL)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(store.loads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutex_reads_load_once() {
    let (_, client) = client(CacheAsideConfig::default());
    let store = Arc::new(SingleRecordStore::new(
        Some(cafe("Cafe")),
        Duration::from_millis(100),
    ));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let client = client.clone();
            let store = store.clone();
            tokio::spawn(async move {
                client
                    .read::<u64, CafeRecord, _>(
                        ReadStrategy::Mutex,
                        SHOP_PREFIX,
                        1u64,
                        store,
                        SHOP_TTL,
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        let value: Option<CafeRecord> = handle.await.unwrap().unwrap();
        assert_eq!(value, Some(cafe("Cafe")));
    }

    assert_eq!(store.loads(), 1);
}

#[tokio::test]
async fn mutex_wait_is_bounded_by_retry_budget() {
    let config = CacheAsideConfig::default()
        .with_retry_backoff(Duration::from_millis(10))
        .with_max_retries(5);
    let (cache, client) = client(config.clone());
    let store = SingleRecordStore::new(Some(cafe("Cafe")), Duration::ZERO);

    cache
        .set_nx_raw("lock:shop:1", "stuck-holder", Duration::from_secs(60))
        .await
        .unwrap();

    let started = Instant::now();
    let result: Result<Option<CafeRecord>, _> = client
        .read_with_mutex(SHOP_PREFIX, &1u64, &store, SHOP_TTL)
        .await;

    assert!(matches!(result, Err(DomainError::Contended { .. })));
    assert!(started.elapsed() < config.max_wait() + Duration::from_millis(500));
    assert_eq!(store.loads(), 0);
}

#[tokio::test]
async fn stale_logical_entry_is_served_then_refreshed() {
    let (cache, client) = client(CacheAsideConfig::default());
    // Slow enough that a synchronous load would be obvious
    let store = Arc::new(SingleRecordStore::new(
        Some(cafe("Cafe (refreshed)")),
        Duration::from_millis(300),
    ));

    let expired = LogicalEnvelope::expiring_at(
        cafe("Cafe"),
        Utc::now() - chrono::Duration::seconds(5),
    );
    cache
        .set_raw("shop:1", &encode_logical(&expired).unwrap(), None)
        .await
        .unwrap();

    let started = Instant::now();
    let stale: Option<CafeRecord> = client
        .read_with_logical_expire(SHOP_PREFIX, 1u64, store.clone(), Duration::from_secs(20))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(stale, Some(cafe("Cafe")));

    client.scheduler().wait_idle().await;

    let fresh: Option<CafeRecord> = client
        .read_with_logical_expire(SHOP_PREFIX, 1u64, store.clone(), Duration::from_secs(20))
        .await
        .unwrap();
    assert_eq!(fresh, Some(cafe("Cafe (refreshed)")));

    let envelope =
        decode_logical::<CafeRecord>(&cache.get_raw("shop:1").await.unwrap().unwrap()).unwrap();
    assert!(envelope.logical_expire_at > expired.logical_expire_at);
    assert_eq!(store.loads(), 1);
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let (_, client) = client(CacheAsideConfig::default());
    let store = SingleRecordStore::new(None, Duration::ZERO);

    client
        .write(SHOP_PREFIX, 1, &cafe("Cafe"), SHOP_TTL)
        .await
        .unwrap();

    let value: Option<CafeRecord> = client
        .read_pass_through(SHOP_PREFIX, &1u64, &store, SHOP_TTL)
        .await
        .unwrap();
    assert_eq!(value, Some(cafe("Cafe")));
    assert_eq!(store.loads(), 0);
}

#[tokio::test]
async fn releasing_unheld_lock_is_harmless() {
    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let lock = DistributedLock::new(cache.clone());
    cache
        .set_raw("shop:1", r#"{"id":1,"name":"Cafe"}"#, None)
        .await
        .unwrap();

    assert_ok!(lock.release("lock:shop:1").await);

    let guard = lock
        .try_acquire("lock:shop:1", Duration::from_secs(10))
        .await
        .unwrap()
        .unwrap();
    guard.release().await.unwrap();
    assert_ok!(lock.release("lock:shop:1").await);

    assert!(cache.exists("shop:1").await.unwrap());
}

#[tokio::test]
async fn shop_service_update_is_visible_on_next_read() {
    let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
    let repository = Arc::new(InMemoryShopRepository::with_shops(sample_shops()));
    let client = CacheAsideClient::new(cache.clone(), Arc::new(RebuildScheduler::with_defaults()));
    let service = ShopService::new(repository.clone(), client);
    let id = ShopId::new(1).unwrap();

    let before = service
        .query_by_id(id, ReadStrategy::Mutex)
        .await
        .unwrap()
        .unwrap();

    let renamed = Shop {
        name: "103 Tea House & Dim Sum".to_string(),
        ..before.clone()
    };
    service.update(renamed).await.unwrap();

    let after = service
        .query_by_id(id, ReadStrategy::Mutex)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.name, "103 Tea House & Dim Sum");
    assert_eq!(repository.reads(), 2);
    assert!(cache.exists(&format!("{}1", SHOP_CACHE_PREFIX)).await.unwrap());
    assert!(repository.get(&id).await.unwrap().is_some());
}
