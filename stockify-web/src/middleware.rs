//! Request-boundary access control
//!
//! Every non-public request goes through the same pipeline: an ordered
//! chain of credential resolvers (bearer token first, then the legacy
//! session cookie) produces a role or nothing, and a pure decision function
//! maps (path, role) to allow / redirect-to-login / redirect-to-denied.

use crate::{auth::jwt::TokenService, AppState};
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use stockify_core::{Identity, Role};
use tracing::debug;

/// Cookie used by the legacy login mechanism
pub const LEGACY_SESSION_COOKIE: &str = "session_token";

/// Terminal outcome of the guard for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    RedirectToDenied,
}

/// Static route → required-role table.
///
/// Prefix matching mirrors the page/API layout of the application: the
/// admin panel and admin APIs need `admin`, the manager tooling accepts
/// `admin` or `manager`, public paths skip authentication entirely.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_prefixes: Vec<String>,
    admin_prefixes: Vec<String>,
    manager_prefixes: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            public_prefixes: [
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/access-denied",
                "/favicon.ico",
                "/api/auth",
                "/api/health",
                "/api/setup",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            admin_prefixes: ["/admin", "/api/admin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            manager_prefixes: ["/api/reports"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RouteGuard {
    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|p| path.starts_with(p))
    }

    /// Pure decision function: (path, resolved role) → outcome.
    pub fn evaluate(&self, path: &str, role: Option<Role>) -> GuardDecision {
        if self.is_public(path) {
            return GuardDecision::Allow;
        }

        let Some(role) = role else {
            return GuardDecision::RedirectToLogin;
        };

        if self.admin_prefixes.iter().any(|p| path.starts_with(p)) && !role.is_admin() {
            return GuardDecision::RedirectToDenied;
        }

        if self.manager_prefixes.iter().any(|p| path.starts_with(p)) && !role.is_manager() {
            return GuardDecision::RedirectToDenied;
        }

        GuardDecision::Allow
    }
}

/// One step of the credential-resolution chain.
///
/// A resolver either recognizes the request and returns the identity, or
/// has no opinion and lets the next resolver try.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, headers: &HeaderMap, tokens: &TokenService) -> Option<Identity>;
}

/// Primary path: `Authorization: Bearer <access token>`
pub struct BearerTokenResolver;

#[async_trait]
impl CredentialResolver for BearerTokenResolver {
    fn name(&self) -> &'static str {
        "bearer"
    }

    async fn resolve(&self, headers: &HeaderMap, tokens: &TokenService) -> Option<Identity> {
        let auth = headers.get("authorization")?.to_str().ok()?;
        let token = auth.strip_prefix("Bearer ")?;

        tokens
            .verify_access(token)
            .ok()
            .map(|claims| claims.identity())
    }
}

/// Compatibility path: an access token carried in the legacy session cookie
pub struct SessionCookieResolver;

#[async_trait]
impl CredentialResolver for SessionCookieResolver {
    fn name(&self) -> &'static str {
        "session-cookie"
    }

    async fn resolve(&self, headers: &HeaderMap, tokens: &TokenService) -> Option<Identity> {
        let cookie_header = headers.get("cookie")?.to_str().ok()?;

        let token = cookie_header.split(';').find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(LEGACY_SESSION_COOKIE)?
                .strip_prefix('=')
        })?;

        tokens
            .verify_access(token)
            .ok()
            .map(|claims| claims.identity())
    }
}

/// The default resolver chain, in priority order
pub fn resolver_chain() -> Vec<Box<dyn CredentialResolver>> {
    vec![Box::new(BearerTokenResolver), Box::new(SessionCookieResolver)]
}

/// Login redirect carrying the requested path, percent-encoded so paths
/// with query metacharacters survive the round-trip
fn login_redirect(path: &str) -> String {
    format!("/login?callbackUrl={}", urlencoding::encode(path))
}

/// Route guard middleware applied in front of every route.
///
/// On Allow, the resolved identity (if any) is stored in the request
/// extensions for handlers that want it.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // Public routes skip credential resolution entirely.
    if state.guard.is_public(&path) {
        return next.run(request).await;
    }

    let mut identity: Option<Identity> = None;
    for resolver in state.resolvers.iter() {
        if let Some(found) = resolver.resolve(request.headers(), &state.tokens).await {
            debug!(resolver = resolver.name(), user = %found.id, "Credentials resolved");
            identity = Some(found);
            break;
        }
    }

    match state.guard.evaluate(&path, identity.as_ref().map(|i| i.role)) {
        GuardDecision::Allow => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        GuardDecision::RedirectToLogin => {
            debug!(path = %path, "Unauthenticated request, redirecting to login");
            Redirect::temporary(&login_redirect(&path)).into_response()
        }
        GuardDecision::RedirectToDenied => {
            debug!(path = %path, "Insufficient role, redirecting to access-denied");
            Redirect::temporary("/access-denied").into_response()
        }
    }
}
