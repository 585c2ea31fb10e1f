pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

use repo_types::Collection;

pub fn router() -> Router<AppState> {
    Collection::ALL
        .into_iter()
        .fold(Router::new(), |router, collection| {
            router.merge(handlers::routes(collection))
        })
}
