use crate::config::Config;
use crate::services::tutor::SharedProvider;
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Text generation for explanations and the tutor.
    pub tutor: SharedProvider,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SharedProvider {
    fn from_ref(state: &AppState) -> Self {
        state.tutor.clone()
    }
}
