//! Fetch strategies.
//!
//! One network attempt per request, no retries. Snapshots are written only
//! after the fetch has completed, and a failed write never fails the request.

use std::time::Instant;

use super::WorkerContext;
use super::classify::{Decision, PassReason, Strategy, classify};
use super::request::{Request, Response, ResponseSource, Served};
use crate::Error;

/// Dispatch one intercepted request.
///
/// `controlled` is false until the worker has activated; uncontrolled
/// requests go straight to the network.
pub async fn respond(ctx: &WorkerContext, request: Request, controlled: bool) -> Result<Served, Error> {
    let decision =
        if controlled { classify(&ctx.config, &request) } else { Decision::PassThrough(PassReason::NotControlled) };

    match decision {
        Decision::PassThrough(reason) => {
            tracing::debug!(url = %request.url, method = %request.method, ?reason, "passing through");
            pass_through(ctx, &request).await
        }
        Decision::Handle(route) => {
            let partition = route.partition.name(&ctx.config).to_string();
            tracing::debug!(url = %request.url, kind = ?route.kind, strategy = ?route.strategy, %partition, "intercepted");
            match route.strategy {
                Strategy::CacheFirst => cache_first(ctx, &partition, &request).await,
                Strategy::NetworkFirst => network_first(ctx, &partition, &request).await,
            }
        }
    }
}

/// Forward the request untouched. No cache reads or writes.
pub async fn pass_through(ctx: &WorkerContext, request: &Request) -> Result<Served, Error> {
    let response = ctx.network.fetch(request).await?;
    Ok(Served { response, source: ResponseSource::PassThrough, partition: None })
}

/// Serve from `partition` if present, otherwise fetch and store on 2xx.
/// A navigation that cannot reach the network gets the offline page.
pub async fn cache_first(ctx: &WorkerContext, partition: &str, request: &Request) -> Result<Served, Error> {
    if let Some(response) = lookup_quietly(ctx, partition, request).await {
        tracing::debug!("cache hit for {} in {}", request.url, partition);
        return Ok(Served { response, source: ResponseSource::Cache, partition: Some(partition.to_string()) });
    }

    tracing::debug!("cache miss for {} in {}", request.url, partition);
    let response = match fetch_timed(ctx, request).await {
        Ok(response) => response,
        Err(err) if err.is_network() && request.is_navigation() => {
            tracing::debug!("network failed for {}: {}", request.url, err);
            return match offline_page(ctx).await {
                Some(served) => {
                    tracing::info!(url = %request.url, "serving offline page");
                    Ok(served)
                }
                None => Err(err),
            };
        }
        Err(err) => return Err(err),
    };
    if response.is_success() {
        store_quietly(ctx, partition, request, &response).await;
    }

    Ok(Served { response, source: ResponseSource::Network, partition: Some(partition.to_string()) })
}

/// Fetch first and refresh `partition` on 2xx; on network failure fall back
/// to any cached copy, then (navigations only) to the offline page.
pub async fn network_first(ctx: &WorkerContext, partition: &str, request: &Request) -> Result<Served, Error> {
    let err = match fetch_timed(ctx, request).await {
        Ok(response) => {
            if response.is_success() {
                store_quietly(ctx, partition, request, &response).await;
            }
            return Ok(Served { response, source: ResponseSource::Network, partition: Some(partition.to_string()) });
        }
        Err(err) if err.is_network() => err,
        Err(err) => return Err(err),
    };

    tracing::debug!("network failed for {}: {}", request.url, err);

    if let Some(response) = lookup_quietly(ctx, partition, request).await {
        return Ok(Served { response, source: ResponseSource::Cache, partition: Some(partition.to_string()) });
    }
    if let Some(response) = lookup_any_quietly(ctx, request).await {
        return Ok(Served { response, source: ResponseSource::Cache, partition: None });
    }

    if request.is_navigation()
        && let Some(served) = offline_page(ctx).await
    {
        tracing::info!(url = %request.url, "serving offline page");
        return Ok(served);
    }

    Err(err)
}

/// The cached offline placeholder, looked up in the static partition first.
pub async fn offline_page(ctx: &WorkerContext) -> Option<Served> {
    let url = match ctx.config.url_for(&ctx.config.offline_page) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("offline page {} does not resolve: {}", ctx.config.offline_page, e);
            return None;
        }
    };
    let request = Request::get(url);

    let static_cache = ctx.config.static_cache.clone();
    if let Some(response) = lookup_quietly(ctx, &static_cache, &request).await {
        return Some(Served { response, source: ResponseSource::Offline, partition: Some(static_cache) });
    }
    lookup_any_quietly(ctx, &request)
        .await
        .map(|response| Served { response, source: ResponseSource::Offline, partition: None })
}

async fn fetch_timed(ctx: &WorkerContext, request: &Request) -> Result<Response, Error> {
    let start = Instant::now();
    let response = ctx.network.fetch(request).await?;
    tracing::debug!(
        "fetched {} -> {} in {}ms ({} bytes)",
        request.url,
        response.status.as_u16(),
        start.elapsed().as_millis(),
        response.body.len()
    );
    Ok(response)
}

async fn lookup_quietly(ctx: &WorkerContext, partition: &str, request: &Request) -> Option<Response> {
    match ctx.storage.lookup(partition, request).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(url = %request.url, partition, "cache lookup failed: {e}");
            None
        }
    }
}

async fn lookup_any_quietly(ctx: &WorkerContext, request: &Request) -> Option<Response> {
    match ctx.storage.lookup_any(request).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(url = %request.url, "cross-partition lookup failed: {e}");
            None
        }
    }
}

/// Write a snapshot; a failure leaves the partition unchanged and is only logged.
pub(crate) async fn store_quietly(ctx: &WorkerContext, partition: &str, request: &Request, response: &Response) {
    if let Err(e) = ctx.storage.store(partition, request, response).await {
        tracing::warn!(url = %request.url, partition, "cache write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockNetwork, shop_url as url, test_context};
    use crate::worker::Network;
    use http::{Method, StatusCode};
    use url::Url;

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let (ctx, net) = test_context().await;
        net.page("/cart", 200, "fresh cart");
        let req = Request::get(url("/cart"));
        let cached = Response::new(req.url.clone(), StatusCode::OK, "cached cart".into());
        ctx.storage.store(&ctx.config.static_cache, &req, &cached).await.unwrap();

        let served = respond(&ctx, req, true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "cached cart");
        assert_eq!(net.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let (ctx, net) = test_context().await;
        net.page("/wishlist", 200, "wishlist");

        let served = respond(&ctx, Request::get(url("/wishlist")), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);

        let again = respond(&ctx, Request::get(url("/wishlist")), true).await.unwrap();
        assert_eq!(again.source, ResponseSource::Cache);
        assert_eq!(net.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let (ctx, net) = test_context().await;
        net.page("/cart", 500, "boom");

        let served = respond(&ctx, Request::get(url("/cart")), true).await.unwrap();
        assert_eq!(served.response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let stored = ctx.storage.lookup(&ctx.config.static_cache, &Request::get(url("/cart"))).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_cache_first_miss_offline_propagates() {
        let (ctx, net) = test_context().await;
        net.set_offline(true);

        let result = respond(&ctx, Request::get(url("/cart")), true).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_network_first_overwrites_entry() {
        let (ctx, net) = test_context().await;
        let req = Request::get(url("/product/42"));
        let stale = Response::new(req.url.clone(), StatusCode::OK, "stale".into());
        ctx.storage.store(&ctx.config.dynamic_cache, &req, &stale).await.unwrap();
        net.page("/product/42", 200, "fresh");

        let served = respond(&ctx, req.clone(), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "fresh");

        let stored = ctx.storage.lookup(&ctx.config.dynamic_cache, &req).await.unwrap().unwrap();
        assert_eq!(stored.text(), "fresh");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (ctx, net) = test_context().await;
        net.page("/api/products", 200, "[1,2,3]");
        respond(&ctx, Request::get(url("/api/products")), true).await.unwrap();

        net.set_offline(true);
        let served = respond(&ctx, Request::get(url("/api/products")), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "[1,2,3]");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_other_partition() {
        let (ctx, net) = test_context().await;
        let req = Request::get(url("/products/featured"));
        let shell = Response::new(req.url.clone(), StatusCode::OK, "from static".into());
        ctx.storage.store(&ctx.config.static_cache, &req, &shell).await.unwrap();
        net.set_offline(true);

        let served = respond(&ctx, req, true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "from static");
    }

    #[tokio::test]
    async fn test_navigation_offline_gets_offline_page() {
        let (ctx, net) = test_context().await;
        let offline_req = Request::get(url("/offline.html"));
        let offline = Response::new(offline_req.url.clone(), StatusCode::OK, "You are offline".into());
        ctx.storage.store(&ctx.config.static_cache, &offline_req, &offline).await.unwrap();
        net.set_offline(true);

        let served = respond(&ctx, Request::navigate(url("/some/unvisited/page")), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.text(), "You are offline");
    }

    #[tokio::test]
    async fn test_shell_navigation_offline_gets_offline_page() {
        let (ctx, net) = test_context().await;
        let offline_req = Request::get(url("/offline.html"));
        let offline = Response::new(offline_req.url.clone(), StatusCode::OK, "You are offline".into());
        ctx.storage.store(&ctx.config.static_cache, &offline_req, &offline).await.unwrap();
        net.set_offline(true);

        let served = respond(&ctx, Request::navigate(url("/cart")), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.text(), "You are offline");
    }

    #[tokio::test]
    async fn test_shell_navigation_offline_without_placeholder_errors() {
        let (ctx, net) = test_context().await;
        net.set_offline(true);

        let result = respond(&ctx, Request::navigate(url("/cart")), true).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_subresource_offline_without_cache_errors() {
        let (ctx, net) = test_context().await;
        let offline_req = Request::get(url("/offline.html"));
        let offline = Response::new(offline_req.url.clone(), StatusCode::OK, "You are offline".into());
        ctx.storage.store(&ctx.config.static_cache, &offline_req, &offline).await.unwrap();
        net.set_offline(true);

        let result = respond(&ctx, Request::get(url("/api/orders")), true).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }

    #[tokio::test]
    async fn test_non_get_is_not_cached() {
        let (ctx, net) = test_context().await;
        net.page("/api/cart", 200, "added");

        let req = Request::new(Method::POST, url("/api/cart"));
        let served = respond(&ctx, req, true).await.unwrap();
        assert_eq!(served.source, ResponseSource::PassThrough);
        assert_eq!(net.calls(), vec![(Method::POST, url("/api/cart").to_string())]);
        assert!(ctx.storage.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_origin_is_not_cached() {
        let (ctx, net) = test_context().await;
        let foreign = Url::parse("https://cdn.example.com/lib.js").unwrap();
        net.page_at(foreign.clone(), 200, "lib");

        let served = respond(&ctx, Request::get(foreign), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::PassThrough);
        assert!(ctx.storage.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uncontrolled_passes_through() {
        let (ctx, net) = test_context().await;
        net.page("/cart", 200, "cart");

        let served = respond(&ctx, Request::get(url("/cart")), false).await.unwrap();
        assert_eq!(served.source, ResponseSource::PassThrough);
        assert!(ctx.storage.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_network_unknown_url_is_404() {
        let net = MockNetwork::new();
        let response = net.fetch(&Request::get(url("/nowhere"))).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
