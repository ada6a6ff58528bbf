// src/crawl/engine.rs
// =============================================================================
// The crawl worker pool.
//
// How it works:
// 1. Every target becomes one task, at most `threads` of them in flight
//    (buffer_unordered)
// 2. Each task waits out the optional delay, builds its own client and
//    fetches the target's page
// 3. With recursion on, the page's assets are fetched one level deep with
//    the same client (so an override IP applies to them too)
// 4. Outcomes are folded into a ResultSet as they complete; the set is only
//    returned once every task has finished
//
// Each task is spawned on its own, so a panic inside one only turns that
// target's outcome into an error.
// =============================================================================

use super::assets::{extract_assets, is_same_host};
use super::fetch::{build_client, fetch_page, fetch_resource};
use super::result::{FetchError, FetchOutcome, PageResponse, ResourceResult, ResultSet};
use crate::config::CrawlConfig;
use crate::target::DomainTarget;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

pub struct Crawler {
    config: Arc<CrawlConfig>,
}

impl Crawler {
    pub fn new(config: CrawlConfig) -> Self {
        Crawler { config: Arc::new(config) }
    }

    pub async fn crawl(&self, targets: Vec<DomainTarget>) -> ResultSet {
        let workers = self.config.threads.max(1);
        info!("starting crawl of {} targets with {} workers", targets.len(), workers);

        stream::iter(targets)
            .map(|target| {
                let config = Arc::clone(&self.config);
                let task_target = target.clone();
                isolate(target, async move { crawl_target(&config, task_target).await })
            })
            .buffer_unordered(workers)
            .fold(ResultSet::new(), |mut results, outcome| async move {
                log_outcome(&outcome);
                results.push(outcome);
                results
            })
            .await
    }
}

// Runs one target's task on its own tokio task. If that task panics, the
// target still gets an outcome.
async fn isolate<F>(target: DomainTarget, task: F) -> FetchOutcome
where
    F: Future<Output = FetchOutcome> + Send + 'static,
{
    let started = Instant::now();
    match tokio::spawn(task).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("worker for {} died: {}", target, err);
            FetchOutcome::failure(target, FetchError::WorkerFault(err.to_string()), started.elapsed())
        }
    }
}

pub async fn crawl_target(config: &CrawlConfig, target: DomainTarget) -> FetchOutcome {
    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay).await;
    }

    debug!("starting to scan {}", target);
    let started = Instant::now();

    let client = match build_client(&target, config) {
        Ok(client) => client,
        Err(err) => return FetchOutcome::failure(target, err, started.elapsed()),
    };

    let page = match fetch_page(&client, target.url()).await {
        Ok(page) => page,
        Err(err) => return FetchOutcome::failure(target, err, started.elapsed()),
    };

    let (resources, skipped) = if config.recursive {
        fetch_assets(&client, config, &page).await
    } else {
        (Vec::new(), Vec::new())
    };

    FetchOutcome::success(target, page, resources, skipped, started.elapsed())
}

// One level only: the assets of the page, never the assets of those assets
async fn fetch_assets(client: &Client, config: &CrawlConfig, page: &PageResponse) -> (Vec<ResourceResult>, Vec<Url>) {
    let (wanted, skipped): (Vec<Url>, Vec<Url>) = extract_assets(&page.body, &page.final_url)
        .into_iter()
        .partition(|asset| {
            config.follow_remote
                || is_same_host(asset, &page.final_url)
                || asset.host_str().map_or(false, |host| config.allows_remote_host(host))
        });

    if !skipped.is_empty() {
        debug!("skipping {} remote assets on {}", skipped.len(), page.final_url);
    }

    let mut resources = Vec::with_capacity(wanted.len());
    for asset in wanted {
        resources.push(fetch_resource(client, asset).await);
    }

    (resources, skipped)
}

fn log_outcome(outcome: &FetchOutcome) {
    match outcome.error() {
        Some(err) => warn!("failed scanning {}: {}", outcome.target(), err),
        None => info!(
            "finished scanning {} in {}ms ({} resources)",
            outcome.target(),
            outcome.elapsed().as_millis(),
            outcome.resources().len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use warp::http::Response;
    use warp::Filter;

    const ASSET_PAGE: &str = r#"<html><head>
        <link rel="stylesheet" href="/style.css">
        <script src="/app.js"></script>
        <script src="http://cdn.remote.test/lib.js"></script>
        </head><body>
        <img src="/style.css">
        <img src="http://images.remote.test/logo.png">
        </body></html>"#;

    async fn spawn_server() -> SocketAddr {
        let redirect = warp::path!("redirect" / u32).map(|n: u32| {
            if n == 0 {
                Response::builder().status(200).body(String::from("done")).unwrap()
            } else {
                Response::builder()
                    .status(302)
                    .header("location", format!("/redirect/{}", n - 1))
                    .body(String::new())
                    .unwrap()
            }
        });

        let stall = warp::path!("stall").and_then(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, warp::Rejection>("too late")
        });

        // Only answers for the vhost.test virtual host
        let vhost = warp::path!("vhost").and(warp::header::<String>("host")).map(|host: String| {
            if host.split(':').next() == Some("vhost.test") {
                Response::builder().status(200).body(String::from("vhost ok")).unwrap()
            } else {
                Response::builder().status(421).body(String::from("wrong host")).unwrap()
            }
        });

        let assets = warp::path!("assets").map(|| warp::reply::html(ASSET_PAGE));
        let style = warp::path!("style.css").map(|| "body { color: red; }");
        let script = warp::path!("app.js").map(|| "console.log('hi');");

        let routes = redirect.or(stall).or(vhost).or(assets).or(style).or(script);
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    fn config() -> CrawlConfig {
        CrawlConfig {
            threads: 4,
            ..CrawlConfig::default()
        }
    }

    fn target(addr: SocketAddr, path: &str) -> DomainTarget {
        DomainTarget::new(&format!("http://{}{}", addr, path), None).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_cap() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(config());

        let results = crawler.crawl(vec![target(addr, "/redirect/15"), target(addr, "/redirect/3")]).await;
        assert_eq!(results.len(), 2);

        let looped = results.find(&format!("http://{}/redirect/15", addr), None).unwrap();
        assert_eq!(looped.error(), Some(&FetchError::TooManyRedirects));

        let followed = results.find(&format!("http://{}/redirect/3", addr), None).unwrap();
        let response = followed.response().unwrap();
        assert_eq!(response.status, 200);
        assert!(response.final_url.as_str().ends_with("/redirect/0"));
    }

    #[tokio::test]
    async fn test_timeout_is_bounded() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(CrawlConfig {
            timeout: Duration::from_secs(1),
            ..config()
        });

        let started = Instant::now();
        let results = crawler.crawl(vec![target(addr, "/stall")]).await;

        assert!(started.elapsed() < Duration::from_secs(4));
        let outcome = results.iter().next().unwrap();
        assert_eq!(outcome.error(), Some(&FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_override_ip_keeps_host() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(config());

        // vhost.test doesn't resolve anywhere; only the override gets us there
        let url = format!("http://vhost.test:{}/vhost", addr.port());
        let overridden = DomainTarget::new(&url, Some("127.0.0.1")).unwrap();
        // Dialing the IP directly sends the wrong Host
        let direct = target(addr, "/vhost");

        let results = crawler.crawl(vec![overridden, direct]).await;

        let outcome = results.find(&url, Some("127.0.0.1".parse().unwrap())).unwrap();
        let response = outcome.response().expect("override fetch failed");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "vhost ok");
        assert_eq!(response.final_url.host_str(), Some("vhost.test"));

        let direct = results.find(&format!("http://{}/vhost", addr), None).unwrap();
        assert_eq!(direct.response().unwrap().status, 421);
    }

    #[tokio::test]
    async fn test_invalid_override_recorded() {
        let crawler = Crawler::new(config());
        let target = DomainTarget::new("http://lw.example.com/", Some("0.0.0.0")).unwrap();

        let results = crawler.crawl(vec![target]).await;
        let outcome = results.iter().next().unwrap();
        assert_eq!(
            outcome.error(),
            Some(&FetchError::InvalidOverrideAddress("0.0.0.0".to_string()))
        );
    }

    #[tokio::test]
    async fn test_same_origin_assets_only() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(CrawlConfig {
            recursive: true,
            follow_remote: false,
            ..config()
        });

        let results = crawler.crawl(vec![target(addr, "/assets")]).await;
        let outcome = results.iter().next().unwrap();
        assert!(outcome.is_ok(), "{:?}", outcome.error());

        let fetched: Vec<String> = outcome.resources().iter().map(|r| r.url.path().to_string()).collect();
        assert_eq!(fetched, vec!["/style.css", "/app.js"]);
        assert!(outcome.resources().iter().all(|r| r.status == Some(200)));
        assert_eq!(outcome.skipped().len(), 2);
    }

    #[tokio::test]
    async fn test_allowed_remote_host() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(CrawlConfig {
            recursive: true,
            follow_remote: false,
            allowed_remote_hosts: vec!["cdn.remote.test".to_string()],
            timeout: Duration::from_secs(3),
            ..config()
        });

        let results = crawler.crawl(vec![target(addr, "/assets")]).await;
        let outcome = results.iter().next().unwrap();

        // The allowed remote asset is attempted (and fails to resolve), the
        // other one is still skipped
        assert_eq!(outcome.resources().len(), 3);
        assert!(outcome.resources()[2].error.is_some());
        assert_eq!(outcome.skipped().len(), 1);
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_no_recursion_by_default() {
        let addr = spawn_server().await;
        let results = Crawler::new(config()).crawl(vec![target(addr, "/assets")]).await;
        let outcome = results.iter().next().unwrap();
        assert!(outcome.resources().is_empty());
        assert!(outcome.skipped().is_empty());
    }

    #[tokio::test]
    async fn test_delay_is_per_target() {
        let addr = spawn_server().await;
        let crawler = Crawler::new(CrawlConfig {
            delay: Duration::from_millis(500),
            ..config()
        });

        let targets = (0..4).map(|n| target(addr, &format!("/redirect/{}", n))).collect();
        let started = Instant::now();
        let results = crawler.crawl(targets).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results.failures(), 0);
        // Four workers sleep side by side, not one after another
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    async fn explode() -> FetchOutcome {
        panic!("worker blew up")
    }

    #[tokio::test]
    async fn test_panic_becomes_outcome() {
        let target = DomainTarget::new("http://panic.example.com/", None).unwrap();
        let outcome = isolate(target.clone(), explode()).await;

        assert_eq!(outcome.target(), &target);
        assert!(matches!(outcome.error(), Some(FetchError::WorkerFault(_))));
    }
}
