use async_trait::async_trait;

use swcache_core::{Error, Network, Request, Response};

/// A network that is never reachable. Lets hosts serve purely from cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineNetwork;

#[async_trait]
impl Network for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        tracing::debug!(url = %request.url, "offline: refusing fetch");
        Err(Error::Offline(format!("{}: network disabled", request.url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_always_offline() {
        let request = Request::get(Url::parse("https://shop.test/cart").unwrap());
        let result = OfflineNetwork.fetch(&request).await;
        assert!(matches!(result, Err(Error::Offline(_))));
    }
}
