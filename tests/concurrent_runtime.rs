use admin_runtime_sdk::{Resources, Runtime};
use std::sync::Arc;
use std::thread;

struct Handles;

impl Resources for Handles {
    type Db = String;
    type Authorizer = String;
    type Scheduler = String;
    type Middleware = String;
    type App = String;
}

const WRITERS: usize = 8;
const READERS: usize = 4;
const ROUNDS: usize = 200;

#[test]
fn concurrent_writers_on_distinct_tenants_lose_nothing() {
    let runtime: Arc<Runtime<Handles>> = Arc::new(Runtime::new());

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let rt = runtime.clone();
        handles.push(thread::spawn(move || {
            let tenant = format!("tenant-{}", w);
            for round in 0..ROUNDS {
                rt.set_db_by_tenant(&tenant, format!("db-{}-{}", w, round)).unwrap();
                rt.set_cache_adapter_by_tenant(
                    &tenant,
                    Arc::new(admin_runtime_sdk::storage::MemoryCache::new()),
                )
                .unwrap();
            }
        }));
    }
    for _ in 0..READERS {
        let rt = runtime.clone();
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                let tenant = format!("tenant-{}", round % WRITERS);
                if let Some(db) = rt.db_by_tenant(&tenant) {
                    assert!(db.starts_with(&format!("db-{}-", round % WRITERS)));
                }
                let _ = rt.all_db();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let all = runtime.all_db();
    assert!(all.global.is_none());
    assert_eq!(all.tenants.len(), WRITERS);
    for w in 0..WRITERS {
        assert_eq!(
            runtime.db_by_tenant(&format!("tenant-{}", w)),
            Some(format!("db-{}-{}", w, ROUNDS - 1))
        );
    }
    assert_eq!(runtime.all_cache_adapter().tenants.len(), WRITERS);
}

#[test]
fn default_tenant_switch_races_with_unscoped_reads() {
    let runtime: Arc<Runtime<Handles>> = Arc::new(Runtime::new());
    runtime.set_db_by_tenant("a", "db-a".to_string()).unwrap();
    runtime.set_db_by_tenant("b", "db-b".to_string()).unwrap();
    runtime.set_default_tenant("a").unwrap();

    let switcher = {
        let rt = runtime.clone();
        thread::spawn(move || {
            for round in 0..ROUNDS {
                rt.set_default_tenant(if round % 2 == 0 { "b" } else { "a" }).unwrap();
            }
        })
    };
    let reader = {
        let rt = runtime.clone();
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                let db = rt.db().unwrap();
                assert!(db == "db-a" || db == "db-b");
            }
        })
    };
    switcher.join().unwrap();
    reader.join().unwrap();
    assert_eq!(runtime.default_tenant(), "a");
    assert_eq!(runtime.db().as_deref(), Some("db-a"));
}
