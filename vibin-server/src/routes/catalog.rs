use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use vibin_core::model::{Album, Artist, Track};
use vibin_core::VibinError;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::waveform;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/albums", get(albums))
        .route("/albums/new", get(new_albums))
        .route("/albums/{id}", get(album_by_id))
        .route("/albums/{id}/tracks", get(album_tracks))
        .route("/artists", get(artists))
        .route("/artists/{id}", get(artist_by_id))
        .route("/tracks", get(tracks))
        .route("/tracks/{id}", get(track_by_id))
        .route("/tracks/{id}/lyrics", get(track_lyrics))
        .route("/tracks/{id}/links", get(track_links))
        .route("/tracks/{id}/waveform", get(waveform::peaks))
        .route("/tracks/{id}/waveform.png", get(waveform::png))
        .route("/tracks/{id}/rms", get(waveform::rms))
}

fn media_server(state: &AppState) -> ApiResult<&vibin_core::mediaserver::MediaServerHandle> {
    state
        .hub
        .media_server()
        .ok_or_else(|| VibinError::MissingDependencyError("no media server is configured".to_string()).into())
}

async fn albums(State(state): State<AppState>) -> ApiResult<Json<Vec<Album>>> {
    let media_server = media_server(&state)?;
    let albums = media_server.albums(&state.hub.settings().all_albums_path).await?;
    Ok(Json(albums))
}

async fn new_albums(State(state): State<AppState>) -> ApiResult<Json<Vec<Album>>> {
    let media_server = media_server(&state)?;
    let settings = state.hub.settings();
    let albums = media_server.new_albums(&settings.new_albums_path, &settings.all_albums_path).await?;
    Ok(Json(albums))
}

async fn album_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Album>> {
    let media_server = media_server(&state)?;
    let albums = media_server.albums(&state.hub.settings().all_albums_path).await?;
    albums
        .into_iter()
        .find(|a| a.id.as_deref() == Some(id.as_str()))
        .map(Json)
        .ok_or_else(|| VibinError::NotFound(format!("no album with id '{id}'")).into())
}

async fn album_tracks(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Track>>> {
    let media_server = media_server(&state)?;
    let tracks = media_server.tracks(&state.hub.settings().all_albums_path).await?;
    Ok(Json(tracks.into_iter().filter(|t| t.album_id.as_deref() == Some(id.as_str())).collect()))
}

async fn artists(State(state): State<AppState>) -> ApiResult<Json<Vec<Artist>>> {
    let media_server = media_server(&state)?;
    let artists = media_server.artists(&state.hub.settings().all_artists_path).await?;
    Ok(Json(artists))
}

async fn artist_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Artist>> {
    let media_server = media_server(&state)?;
    let artists = media_server.artists(&state.hub.settings().all_artists_path).await?;
    artists
        .into_iter()
        .find(|a| a.id.as_deref() == Some(id.as_str()))
        .map(Json)
        .ok_or_else(|| VibinError::NotFound(format!("no artist with id '{id}'")).into())
}

async fn tracks(State(state): State<AppState>) -> ApiResult<Json<Vec<Track>>> {
    let media_server = media_server(&state)?;
    let tracks = media_server.tracks(&state.hub.settings().all_albums_path).await?;
    Ok(Json(tracks))
}

async fn track_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Track>> {
    let media_server = media_server(&state)?;
    let tracks = media_server.tracks(&state.hub.settings().all_albums_path).await?;
    tracks
        .into_iter()
        .find(|t| t.id.as_deref() == Some(id.as_str()))
        .map(Json)
        .ok_or_else(|| VibinError::NotFound(format!("no track with id '{id}'")).into())
}

async fn track_lyrics(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Option<vibin_core::model::Lyrics>>> {
    let media_server = media_server(&state)?;
    let tracks = media_server.tracks(&state.hub.settings().all_albums_path).await?;
    let track = tracks
        .into_iter()
        .find(|t| t.id.as_deref() == Some(id.as_str()))
        .ok_or_else(|| VibinError::NotFound(format!("no track with id '{id}'")))?;
    let artist = track.artist.or(track.creator).unwrap_or_default();
    let title = track.title.unwrap_or_default();
    let lyrics = state.hub.lyrics().get_or_fetch(&id, &artist, &title)?;
    Ok(Json(lyrics))
}

async fn track_links(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<vibin_core::model::Links>> {
    let media_server = media_server(&state)?;
    let tracks = media_server.tracks(&state.hub.settings().all_albums_path).await?;
    let track = tracks
        .into_iter()
        .find(|t| t.id.as_deref() == Some(id.as_str()))
        .ok_or_else(|| VibinError::NotFound(format!("no track with id '{id}'")))?;
    let artist = track.artist.or(track.creator).unwrap_or_default();
    let links = state.hub.links().get_or_fetch(&id, &artist, track.album.as_deref())?;
    Ok(Json(links))
}
