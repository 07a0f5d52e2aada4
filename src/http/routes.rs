use crate::app::AppState;
use axum::Router;

/// Trait for composable route modules
///
/// Each domain (content, accounts, billing) registers its own routes and is
/// composed into the main application router.
pub trait RouteModule {
    /// Returns a router with all routes for this module
    ///
    /// The router should NOT have state applied - state will be applied
    /// when the application router is assembled. Handlers access shared
    /// collaborators through `State<AppState>`.
    fn routes(&self) -> Router<AppState>
    where
        Self: Sized;

    /// Optional: specify a path prefix for all routes in this module
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Registers this module's routes into the application router
    fn register(self, router: Router<AppState>) -> Router<AppState>
    where
        Self: Sized,
    {
        let routes = self.routes();

        if let Some(prefix) = self.prefix() {
            router.nest(prefix, routes)
        } else {
            router.merge(routes)
        }
    }
}
