//! Gateway server
//!
//! Assembles the authenticated router: the profile API, the session
//! monitoring surface, an optional embedder-provided tunnel router and the
//! static file fallback, all behind the authentication middleware.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::api::{self, AppState};
use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::profiles::ProfileStore;
use crate::sessions::SessionRegistry;
use crate::{Error, Result};

/// The gateway: settings, stores and router assembly
pub struct Gateway {
    settings: Arc<Settings>,
    profiles: Arc<ProfileStore>,
    sessions: Arc<SessionRegistry>,
    tunnel: Option<Router>,
}

impl Gateway {
    /// Create a gateway from startup settings
    ///
    /// The catalog moves into the profile store, which persists back to
    /// `config_path`; the retained settings value carries everything else.
    pub fn new(mut settings: Settings, config_path: impl Into<PathBuf>) -> Self {
        let profiles = Arc::new(ProfileStore::new(settings.clone(), config_path));
        // The store owns the catalog exclusively from here on
        settings.conns.clear();

        Self {
            settings: Arc::new(settings),
            profiles,
            sessions: Arc::new(SessionRegistry::new()),
            tunnel: None,
        }
    }

    /// The startup settings
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    /// Handle for the tunnel collaborator to register opens and closes
    #[must_use]
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    /// Handle for the tunnel collaborator to resolve connection profiles
    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileStore> {
        Arc::clone(&self.profiles)
    }

    /// Mount an embedder-provided tunnel router inside the authenticated app
    ///
    /// The tunnel routes see the same authentication middleware as the core
    /// surface and can read the resolved [`crate::auth::Identity`] from the
    /// request extensions.
    #[must_use]
    pub fn merge_tunnel(mut self, tunnel: Router) -> Self {
        self.tunnel = Some(tunnel);
        self
    }

    /// Build the complete router
    #[must_use]
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            settings: Arc::clone(&self.settings),
            profiles: Arc::clone(&self.profiles),
            sessions: Arc::clone(&self.sessions),
        });
        let auth = Arc::new(self.settings.server.auth.clone());

        let mut app = Router::new()
            .route("/sessions/", get(api::list_sessions))
            .route(
                "/config",
                get(api::read_profiles)
                    .delete(api::delete_profile)
                    .post(api::update_profile),
            )
            .with_state(state);

        if let Some(tunnel) = self.tunnel.clone() {
            app = app.merge(tunnel);
        }

        let static_path = &self.settings.server.static_files.path;
        if !static_path.is_empty() {
            app = app.fallback_service(ServeDir::new(static_path));
        }

        // Authentication middleware (applied before the other layers)
        app.layer(middleware::from_fn_with_state(auth, auth_middleware))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.settings
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.settings.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %addr,
            guacd = %self.settings.guacd_address(),
            "guacgate listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ConnectionProfile;

    #[test]
    fn test_catalog_moves_into_store() {
        let mut settings = Settings::default();
        let mut profile = ConnectionProfile::new();
        profile.set("scheme", "vnc");
        profile.set("hostname", "h");
        profile.set("port", "5900");
        profile.set("username", "u");
        settings.conns.push(profile);

        let dir = tempfile::tempdir().unwrap();
        let gateway = Gateway::new(settings, dir.path().join("config.yaml"));

        assert!(gateway.settings().conns.is_empty());
        assert_eq!(gateway.profiles().ids(), vec!["vnc-h-5900-u".to_string()]);
    }

    #[test]
    fn test_router_builds_with_and_without_extras() {
        let dir = tempfile::tempdir().unwrap();

        let gateway = Gateway::new(Settings::default(), dir.path().join("config.yaml"));
        let _ = gateway.router();

        let mut settings = Settings::default();
        settings.server.static_files.path = dir.path().display().to_string();
        let gateway = Gateway::new(settings, dir.path().join("config.yaml"))
            .merge_tunnel(Router::new().route("/tunnel", get(|| async { "ok" })));
        let _ = gateway.router();
    }
}
