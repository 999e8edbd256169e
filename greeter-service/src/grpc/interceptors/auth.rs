//! Authentication stage

use async_trait::async_trait;
use tonic::Status;

use crate::auth::{AuthenticatedIdentity, TokenValidator};
use crate::config::AuthConfig;
use crate::grpc::context::CallContext;
use crate::grpc::middleware::{CallOutcome, Interceptor, Next, Payload};

const AUTHORIZATION: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

const MISSING_CREDENTIAL: &str = "Missing or invalid Authorization header";
const INVALID_CREDENTIAL: &str = "Invalid or expired token";

/// Validates `authorization: Bearer <token>` metadata before forwarding
///
/// Rejected calls never reach the next stage. Accepted calls continue with the
/// resolved identity bound to their context.
pub struct AuthInterceptor<V> {
    validator: V,
    exempt_suffixes: Vec<String>,
}

impl<V: TokenValidator> AuthInterceptor<V> {
    pub fn new(validator: V, config: &AuthConfig) -> Self {
        let exempt_suffixes = config
            .exempt_methods
            .iter()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Self {
            validator,
            exempt_suffixes,
        }
    }

    /// Whether `method` ends with a configured exemption, ignoring case
    pub fn is_exempt(&self, method: &str) -> bool {
        let method = method.to_ascii_lowercase();
        self.exempt_suffixes
            .iter()
            .any(|suffix| method.ends_with(suffix.as_str()))
    }

    fn authenticate(&self, context: &CallContext) -> Result<AuthenticatedIdentity, Status> {
        let token = context
            .metadata_value(AUTHORIZATION)
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| {
                tracing::warn!(
                    method = %context.method(),
                    request_id = %context.request_id(),
                    "Unauthorized gRPC call - missing token"
                );
                Status::unauthenticated(MISSING_CREDENTIAL)
            })?;

        let claims = self.validator.validate_token(token).map_err(|e| {
            tracing::warn!(
                method = %context.method(),
                request_id = %context.request_id(),
                reason = %e,
                "Unauthorized gRPC call - invalid token"
            );
            Status::unauthenticated(INVALID_CREDENTIAL)
        })?;

        Ok(AuthenticatedIdentity::from(claims))
    }
}

#[async_trait]
impl<V> Interceptor for AuthInterceptor<V>
where
    V: TokenValidator + 'static,
{
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn intercept(
        &self,
        context: CallContext,
        request: Box<dyn Payload>,
        next: Next<'_>,
    ) -> CallOutcome {
        if self.is_exempt(context.method()) {
            tracing::debug!(method = %context.method(), "Skipping authentication for exempt method");
            return next.run(context, request).await;
        }

        match self.authenticate(&context) {
            Ok(identity) => {
                tracing::info!(
                    method = %context.method(),
                    request_id = %context.request_id(),
                    user = %identity.display_name(),
                    "Authenticated gRPC user"
                );
                next.run(context.with_identity(identity), request).await
            }
            Err(status) => CallOutcome::failed(context, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_support::{valid_token, validator};
    use crate::grpc::middleware::Pipeline;
    use serde::Serialize;
    use std::sync::{Arc, Mutex};
    use tonic::metadata::MetadataMap;
    use tonic::Code;

    const METHOD: &str = "/greet.Greeter/GetById";

    #[derive(Debug, Serialize)]
    struct Ping;

    /// Outer stage capturing the identity visible after the call completes
    struct IdentityRecorder {
        seen: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl Interceptor for IdentityRecorder {
        fn name(&self) -> &'static str {
            "identity-recorder"
        }

        async fn intercept(
            &self,
            context: CallContext,
            request: Box<dyn Payload>,
            next: Next<'_>,
        ) -> CallOutcome {
            let outcome = next.run(context, request).await;
            *self.seen.lock().unwrap() = Some(outcome.context.identity_name().to_string());
            outcome
        }
    }

    fn pipeline(exempt: &[&str]) -> Pipeline {
        let config = AuthConfig {
            exempt_methods: exempt.iter().map(|s| s.to_string()).collect(),
        };
        Pipeline::new().with(AuthInterceptor::new(validator(), &config))
    }

    fn context_with(header: Option<(&'static str, String)>) -> CallContext {
        let mut metadata = MetadataMap::new();
        if let Some((key, value)) = header {
            metadata.insert(key, value.parse().unwrap());
        }
        CallContext::new(METHOD, metadata)
    }

    async fn run(pipeline: &Pipeline, context: CallContext) -> Result<String, Status> {
        pipeline
            .call(context, Ping, |ctx, _req: Ping| async move {
                Ok(ctx.identity_name().to_string())
            })
            .await
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let status = run(&pipeline(&[]), context_with(None)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), MISSING_CREDENTIAL);
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_unauthenticated() {
        let header = Some(("authorization", format!("Basic {}", valid_token(None))));
        let status = run(&pipeline(&[]), context_with(header)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), MISSING_CREDENTIAL);
    }

    #[tokio::test]
    async fn test_lowercase_bearer_prefix_is_rejected() {
        let header = Some(("authorization", format!("bearer {}", valid_token(None))));
        let status = run(&pipeline(&[]), context_with(header)).await.unwrap_err();
        assert_eq!(status.message(), MISSING_CREDENTIAL);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let header = Some(("authorization", "Bearer garbage".to_string()));
        let status = run(&pipeline(&[]), context_with(header)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), INVALID_CREDENTIAL);
    }

    #[tokio::test]
    async fn test_valid_token_binds_identity() {
        let header = Some(("authorization", format!("Bearer {}", valid_token(Some("alice")))));
        let user = run(&pipeline(&[]), context_with(header)).await.unwrap();
        assert_eq!(user, "alice");
    }

    #[tokio::test]
    async fn test_valid_token_without_name_is_anonymous() {
        let header = Some(("authorization", format!("Bearer {}", valid_token(None))));
        let user = run(&pipeline(&[]), context_with(header)).await.unwrap();
        assert_eq!(user, "Anonymous");
    }

    #[tokio::test]
    async fn test_identity_visible_to_outer_stage() {
        let seen = Arc::new(Mutex::new(None));
        let pipeline = Pipeline::new()
            .with(IdentityRecorder { seen: seen.clone() })
            .with(AuthInterceptor::new(validator(), &AuthConfig::default()));

        let header = Some(("authorization", format!("Bearer {}", valid_token(Some("bob")))));
        run(&pipeline, context_with(header)).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_exempt_method_skips_credentials() {
        let pipeline = pipeline(&["GREET.greeter/getbyid"]);
        let user = run(&pipeline, context_with(None)).await.unwrap();
        assert_eq!(user, "Anonymous");
    }

    #[test]
    fn test_exemption_matching() {
        let config = AuthConfig {
            exempt_methods: vec!["greet.Greeter/Login".to_string(), "  ".to_string()],
        };
        let auth = AuthInterceptor::new(validator(), &config);
        assert!(auth.is_exempt("/greet.Greeter/Login"));
        assert!(auth.is_exempt("/GREET.GREETER/LOGIN"));
        assert!(!auth.is_exempt("/greet.Greeter/GetById"));
        assert!(!auth.is_exempt("/greet.Greeter/LoginHistory"));
    }

    #[test]
    fn test_no_exemptions_by_default() {
        let auth = AuthInterceptor::new(validator(), &AuthConfig::default());
        assert!(!auth.is_exempt("/greet.Greeter/Farewell"));
        assert!(!auth.is_exempt(""));
    }
}
