//! A command-line demo of `content_cache`.
//!
//! All of the cache logic lives in `fn make_a_request()`; everything else is
//! plumbing for the menu loop. The toy producer in `mod server` stands in
//! for an origin: each resource has its own freshness/staleness profile.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use content_cache::directives::{RawMaxStale, RawProducerDirectives};
use content_cache::{Cache, CacheRequest, DiagnosticEvent, ProducerFailure, ProducerResult, SingleProducerCache};

type Store = MemoryStore;
type Wrapper = SingleProducerCache<String, Store, Server>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cache = Arc::new(Cache::new(MemoryStore::default()));
    let wrapper = Arc::new(SingleProducerCache::new(Arc::clone(&cache), Server));

    let mut diagnostics = wrapper.subscribe_diagnostics();
    tokio::spawn(async move {
        while let Ok(event) = diagnostics.recv().await {
            print_diagnostic(&event);
        }
    });

    let items = ["make a request", "advance time", "list resources", "quit"];
    loop {
        println!();
        for (i, item) in items.iter().enumerate() {
            println!("  {}) {item}", i + 1);
        }
        match prompt("pick an action").as_str() {
            "1" => make_a_request(&wrapper).await,
            "2" => advance_time().await,
            "3" => list_resources(),
            "4" | "q" | "quit" => break,
            other => println!("unrecognized choice: {other:?}"),
        }
    }
    println!("goodbye!");
}

async fn make_a_request(wrapper: &Wrapper) {
    let path = prompt("which resource (/current-time, /cached-current-time, /friends-online)");
    match wrapper.get(path.as_str()).await {
        Ok(entry) => println!("-> {}", entry.content),
        Err(e) => println!("-> request failed: {e}"),
    }
}

async fn advance_time() {
    let seconds: u64 = prompt("seconds to advance").parse().unwrap_or(0);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    println!("advanced {seconds}s");
}

fn list_resources() {
    println!();
    for (path, desc) in server::CATALOG {
        println!("  {path:23} {desc}");
    }
    println!();
}

fn print_diagnostic(event: &DiagnosticEvent) {
    println!("[diagnostics] {:?} {}", event.outcome, event.cache_key);
}

fn prompt(label: &str) -> String {
    print!("{label}: ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok();
    line.trim().to_owned()
}

/// A single producer backed by `mod server`'s toy resource catalog.
struct Server;

#[async_trait]
impl content_cache::Producer<String> for Server {
    async fn produce(&self, request: CacheRequest) -> Result<ProducerResult<String>, ProducerFailure> {
        server::produce(&request.id)
    }
}

mod server {
    use super::*;

    pub const CATALOG: &[(&str, &str)] = &[
        ("/current-time", "never cached (freshUntilAge: 0, no maxStale)"),
        ("/cached-current-time", "fresh for 10s"),
        ("/friends-online", "fresh for 30s, then stale-while-revalidate for 30s more"),
    ];

    pub fn produce(path: &str) -> Result<ProducerResult<String>, ProducerFailure> {
        let (content, fresh_until_age, max_stale) = match path {
            "/current-time" => (format!("served at {:?}", std::time::SystemTime::now()), 0.0, None),
            "/cached-current-time" => (format!("cached at {:?}", std::time::SystemTime::now()), 10.0, None),
            "/friends-online" => {
                let n = std::time::SystemTime::now()
                    .duration_since(std::time::SystemTime::UNIX_EPOCH)
                    .unwrap()
                    .as_secs()
                    % 15;
                (format!("{n} friends online"), 30.0, Some((0.0, 30.0, 30.0)))
            }
            other => {
                return Err(ProducerFailure::new(UnknownResource(other.to_owned())));
            }
        };
        let max_stale = max_stale.map(|(w, r, e)| RawMaxStale { without_revalidation: w, while_revalidate: r, if_error: e });
        Ok(ProducerResult {
            vary: Default::default(),
            content,
            directives: RawProducerDirectives { fresh_until_age, max_stale, store_for: None }.normalize(),
            validators: None,
            supplemental_resources: Vec::new(),
        })
    }

    #[derive(Debug)]
    pub struct UnknownResource(pub String);

    impl std::fmt::Display for UnknownResource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "no such resource: {}", self.0)
        }
    }

    impl std::error::Error for UnknownResource {}
}

/// A minimal in-process store, just enough to drive the demo — not part of
/// the public API.
#[derive(Default)]
struct MemoryStore {
    entries: std::sync::Mutex<Vec<content_cache::Entry<String>>>,
}

#[async_trait]
impl content_cache::Store<String> for MemoryStore {
    async fn get(
        &self,
        id: &str,
        params: &content_cache::Params,
    ) -> Result<Vec<content_cache::Entry<String>>, content_cache::StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.id == id && content_cache::param::vary_matches(&e.vary, params))
            .cloned()
            .collect())
    }

    async fn store(
        &self,
        entries: Vec<(content_cache::Entry<String>, f64)>,
    ) -> Result<(), content_cache::StoreError> {
        let mut store = self.entries.lock().unwrap();
        for (entry, _max_store_for_seconds) in entries {
            store.retain(|e| !(e.id == entry.id && e.vary == entry.vary));
            store.push(entry);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), content_cache::StoreError> {
        self.entries.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }

    async fn close(&self, _timeout: Option<Duration>) -> Result<(), content_cache::StoreError> {
        Ok(())
    }
}
