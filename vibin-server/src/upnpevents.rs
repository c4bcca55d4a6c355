//! `/upnpevents/{device}/{service}`: GENA `NOTIFY` ingress for UPnP eventing.
//! `NOTIFY` isn't one of axum's built-in `MethodFilter` verbs, so the route
//! is registered with `any()` and the method is checked by hand; anything
//! but `NOTIFY` is rejected with 405.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::any;
use axum::Router;
use tracing::warn;
use vibin_core::hub::UpnpPropertyDevice;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/upnpevents/{device}/{service}", any(notify))
}

async fn notify(State(state): State<AppState>, Path((device, service)): Path<(String, String)>, method: Method, body: Bytes) -> StatusCode {
    if method.as_str() != "NOTIFY" {
        return StatusCode::METHOD_NOT_ALLOWED;
    }

    let upnp_device = match device.as_str() {
        "streamer" => UpnpPropertyDevice::Streamer,
        "media_server" => UpnpPropertyDevice::MediaServer,
        other => {
            warn!(device = other, "NOTIFY for unknown device, ignoring");
            return StatusCode::NOT_FOUND;
        }
    };

    let values = match vibin_upnp::parse_gena_property_set(&body) {
        Ok(values) => values,
        Err(err) => {
            warn!(%err, device, service, "could not parse GENA NOTIFY body");
            return StatusCode::BAD_REQUEST;
        }
    };

    state.hub.report_upnp_properties(upnp_device, service, values);
    StatusCode::OK
}
