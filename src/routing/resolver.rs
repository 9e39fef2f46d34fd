//! Route resolution from plugin declarations.

use std::collections::{HashMap, HashSet};

use axum::http::Method;
use axum::routing::MethodRouter;
use axum::Router;
use thiserror::Error;

use crate::http::server::AppState;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("plugin '{plugin}' declares duplicate route {method} {path}")]
    Duplicate {
        plugin: &'static str,
        method: Method,
        path: String,
    },
}

/// One declared route. Extra per-route middleware is layered onto the
/// handler by the declaring plugin before it hands the spec over.
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub handler: MethodRouter<AppState>,
}

impl RouteSpec {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        handler: MethodRouter<AppState>,
    ) -> RouteSpec {
        RouteSpec {
            method,
            path: path.into(),
            handler,
        }
    }
}

/// A plugin contributes named routes; the canonical pipeline is applied to
/// the assembled router, not per plugin.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn routes(&self) -> Vec<RouteSpec>;
}

/// Materializes plugin routes into an axum router, rejecting duplicates.
#[derive(Default)]
pub struct RouteResolver {
    seen: HashSet<(Method, String)>,
    handlers: HashMap<String, MethodRouter<AppState>>,
    order: Vec<String>,
}

impl RouteResolver {
    pub fn new() -> RouteResolver {
        RouteResolver::default()
    }

    pub fn register(&mut self, plugin: &dyn Plugin) -> Result<(), RouteError> {
        for spec in plugin.routes() {
            let key = (spec.method.clone(), spec.path.clone());
            if !self.seen.insert(key) {
                return Err(RouteError::Duplicate {
                    plugin: plugin.name(),
                    method: spec.method,
                    path: spec.path,
                });
            }
            tracing::debug!(
                plugin = plugin.name(),
                method = %spec.method,
                path = %spec.path,
                "route registered"
            );
            match self.handlers.remove(&spec.path) {
                Some(existing) => {
                    self.handlers
                        .insert(spec.path.clone(), existing.merge(spec.handler));
                }
                None => {
                    self.order.push(spec.path.clone());
                    self.handlers.insert(spec.path.clone(), spec.handler);
                }
            }
        }
        Ok(())
    }

    pub fn into_router(mut self) -> Router<AppState> {
        let mut router = Router::new();
        for path in self.order {
            if let Some(handler) = self.handlers.remove(&path) {
                router = router.route(&path, handler);
            }
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};

    struct TestPlugin(&'static str, Vec<(Method, &'static str)>);

    impl Plugin for TestPlugin {
        fn name(&self) -> &'static str {
            self.0
        }

        fn routes(&self) -> Vec<RouteSpec> {
            self.1
                .iter()
                .map(|(method, path)| {
                    let handler = match *method {
                        Method::POST => post(|| async { "" }),
                        _ => get(|| async { "" }),
                    };
                    RouteSpec::new(method.clone(), *path, handler)
                })
                .collect()
        }
    }

    #[test]
    fn test_duplicate_route_is_fatal() {
        let mut resolver = RouteResolver::new();
        resolver
            .register(&TestPlugin("a", vec![(Method::GET, "/_analytics")]))
            .unwrap();
        let err = resolver
            .register(&TestPlugin("b", vec![(Method::GET, "/_analytics")]))
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { plugin: "b", .. }));
    }

    #[test]
    fn test_same_path_different_methods_merge() {
        let mut resolver = RouteResolver::new();
        resolver
            .register(&TestPlugin(
                "a",
                vec![(Method::GET, "/_thing"), (Method::POST, "/_thing")],
            ))
            .unwrap();
        // Merging both methods under one path must not panic.
        let _router: Router<AppState> = resolver.into_router();
    }
}
