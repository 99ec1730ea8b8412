//! Tower middleware that enforces a rate limit policy per request.
//!
//! The layer doesn't know *how* limiting works, only that it should ask the
//! [`Throttle`] before letting a request through. One layer carries one
//! [`Classification`] plus an identifier extractor; mount separate layers on
//! auth routes and general routes.

use crate::clock::Clock;
use crate::counter::WindowCounter;
use crate::error::ThrottleError;
use crate::policy::Classification;
use crate::throttle::{Throttle, Verdict};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

type IdentifierFn<Req> = Arc<dyn Fn(&Req) -> String + Send + Sync>;

/// A layer that runs a [`Throttle`] check before the wrapped service.
pub struct ThrottleLayer<S, C, Req> {
    throttle: Arc<Throttle<S, C>>,
    classification: Classification,
    identify: IdentifierFn<Req>,
}

impl<S, C, Req> Clone for ThrottleLayer<S, C, Req> {
    fn clone(&self) -> Self {
        Self {
            throttle: self.throttle.clone(),
            classification: self.classification,
            identify: self.identify.clone(),
        }
    }
}

impl<S, C, Req> ThrottleLayer<S, C, Req> {
    /// Create a layer that classifies every request the same way and keys
    /// counters by `identify(request)` — typically the forwarded client
    /// address (see [`client_identifier`](crate::identity::client_identifier)).
    pub fn new(
        throttle: Throttle<S, C>,
        classification: Classification,
        identify: impl Fn(&Req) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            throttle: Arc::new(throttle),
            classification,
            identify: Arc::new(identify),
        }
    }
}

impl<Svc, S, C, Req> Layer<Svc> for ThrottleLayer<S, C, Req> {
    type Service = ThrottleService<Svc, S, C, Req>;

    fn layer(&self, service: Svc) -> Self::Service {
        ThrottleService {
            inner: service,
            throttle: self.throttle.clone(),
            classification: self.classification,
            identify: self.identify.clone(),
        }
    }
}

/// Middleware service produced by [`ThrottleLayer`].
pub struct ThrottleService<Svc, S, C, Req> {
    inner: Svc,
    throttle: Arc<Throttle<S, C>>,
    classification: Classification,
    identify: IdentifierFn<Req>,
}

impl<Svc: Clone, S, C, Req> Clone for ThrottleService<Svc, S, C, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            throttle: self.throttle.clone(),
            classification: self.classification,
            identify: self.identify.clone(),
        }
    }
}

impl<Svc, S, C, Req> Service<Req> for ThrottleService<Svc, S, C, Req>
where
    Svc: Service<Req> + Clone + Send + 'static,
    Svc::Future: Send + 'static,
    Svc::Error: std::error::Error + Send + Sync + 'static,
    S: WindowCounter + Send + Sync + 'static,
    C: Clock + 'static,
    Req: Send + 'static,
{
    type Response = Svc::Response;
    type Error = ThrottleError<Svc::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(ThrottleError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let throttle = self.throttle.clone();
        let classification = self.classification;
        let identifier = (self.identify)(&req);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match throttle.check(classification, &identifier).await {
                // Fail-open admissions pass through here as well.
                Verdict::Allowed { .. } => inner.call(req).await.map_err(ThrottleError::Inner),
                Verdict::Denied { message } => Err(ThrottleError::Denied { message }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::InMemoryCounter;
    use crate::policy;
    use tower::{Service, ServiceBuilder};

    #[derive(Clone)]
    struct EchoService;

    impl Service<&'static str> for EchoService {
        type Response = &'static str;
        type Error = std::io::Error;
        type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: &'static str) -> Self::Future {
            futures::future::ready(Ok(req))
        }
    }

    #[derive(Clone)]
    struct FailingService;

    impl Service<&'static str> for FailingService {
        type Response = &'static str;
        type Error = std::io::Error;
        type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: &'static str) -> Self::Future {
            futures::future::ready(Err(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
        }
    }

    #[tokio::test]
    async fn admits_until_window_full_then_denies() {
        let layer = ThrottleLayer::new(
            Throttle::new(InMemoryCounter::new()),
            Classification::Auth,
            |_req: &&'static str| "client-a".to_string(),
        );
        let mut svc = ServiceBuilder::new().layer(layer).service(EchoService);

        for _ in 0..5 {
            let out = svc.call("ping").await.expect("inside quota");
            assert_eq!(out, "ping");
        }

        let err = svc.call("ping").await.expect_err("over quota");
        assert!(err.is_denied());
        assert_eq!(err.to_string(), policy::AUTH.denial_message);
    }

    #[tokio::test]
    async fn counters_are_keyed_by_extracted_identifier() {
        let layer = ThrottleLayer::new(
            Throttle::new(InMemoryCounter::new()),
            Classification::Auth,
            |req: &&'static str| (*req).to_string(),
        );
        let mut svc = ServiceBuilder::new().layer(layer).service(EchoService);

        for _ in 0..5 {
            svc.call("tenant-a").await.expect("inside quota");
        }
        assert!(svc.call("tenant-a").await.is_err());

        // A different identifier still has its full quota.
        assert!(svc.call("tenant-b").await.is_ok());
    }

    #[tokio::test]
    async fn inner_errors_pass_through_untouched() {
        let layer = ThrottleLayer::new(
            Throttle::new(InMemoryCounter::new()),
            Classification::General,
            |_req: &&'static str| "client".to_string(),
        );
        let mut svc = ServiceBuilder::new().layer(layer).service(FailingService);

        let err = svc.call("ping").await.expect_err("inner failure");
        assert!(!err.is_denied());
        assert_eq!(err.into_inner().unwrap().to_string(), "boom");
    }
}
