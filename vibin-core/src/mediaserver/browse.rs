//! `ContentDirectory::Browse` SOAP calls and DIDL-Lite-to-JSON flattening.
//! Grounded on `vibin-upnp::soap::invoke_action_expecting` for the call
//! shape and `vibin-didl::parse` for the response body.

use reqwest::Client;

use crate::errors::{Result, VibinError};

async fn browse(client: &Client, control_url: &str, service_type: &str, object_id: &str, browse_flag: &str) -> Result<String> {
    let values = vibin_upnp::soap::invoke_action_expecting(
        client,
        control_url,
        service_type,
        "Browse",
        &[
            ("ObjectID", object_id),
            ("BrowseFlag", browse_flag),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", "0"),
            ("SortCriteria", ""),
        ],
        &["Result"],
    )
    .await
    .map_err(|err| match &err {
        vibin_upnp::SoapError::Fault { code: Some(701), .. } => VibinError::NotFound(format!("no such media object: {object_id}")),
        other => VibinError::MediaServerError(other.to_string()),
    })?;

    values.into_iter().next().ok_or_else(|| VibinError::MediaServerError("Browse response missing Result".to_string()))
}

pub async fn browse_children(client: &Client, control_url: &str, service_type: &str, parent_id: &str) -> Result<Vec<serde_json::Value>> {
    let didl_xml = browse(client, control_url, service_type, parent_id, "BrowseDirectChildren").await?;
    didl_to_json_children(&didl_xml)
}

pub async fn browse_metadata(client: &Client, control_url: &str, service_type: &str, id: &str) -> Result<serde_json::Value> {
    let didl_xml = browse(client, control_url, service_type, id, "BrowseMetadata").await?;
    let children = didl_to_json_children(&didl_xml)?;
    children.into_iter().next().ok_or_else(|| VibinError::NotFound(format!("no media object with id {id}")))
}

/// Flattens a DIDL-Lite document's containers and items into plain JSON
/// objects, one per entry, in document order. Downstream code deserializes
/// these into `Album`/`Artist`/`Track`/`MediaFolder` with serde as needed.
fn didl_to_json_children(didl_xml: &str) -> Result<Vec<serde_json::Value>> {
    let parsed = vibin_didl::parse(didl_xml).map_err(|err| VibinError::MediaServerError(format!("could not parse DIDL-Lite response: {err}")))?;

    let mut out = Vec::new();
    for container in parsed.containers {
        out.push(serde_json::json!({
            "id": container.id,
            "parent_id": container.parent_id,
            "title": container.title,
            "class": container.class,
            "artist": container.artist,
            "genre": container.genre,
            "date": container.date,
            "creator": container.creator,
        }));
    }
    for item in parsed.items {
        out.push(serde_json::json!({
            "id": item.id,
            "album_id": item.parent_id,
            "title": item.title,
            "creator": item.creator,
            "artist": item.artist,
            "album": item.album,
            "original_track_number": item.original_track_number,
            "album_art_uri": item.album_art_uri,
        }));
    }
    Ok(out)
}
