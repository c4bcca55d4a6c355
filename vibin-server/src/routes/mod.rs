mod browse;
mod catalog;
mod favorites;
mod playlists;
mod presets;
mod queue;
mod system;
mod transport;
mod vibin;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(transport::router())
        .merge(queue::router())
        .merge(catalog::router())
        .merge(browse::router())
        .merge(favorites::router())
        .merge(playlists::router())
        .merge(presets::router())
        .merge(system::router())
        .merge(vibin::router())
}
