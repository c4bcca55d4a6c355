//! `idsFromFilename`: extracts id-shaped tokens from a filename stem and
//! classifies each against the known album/artist/track id sets (spec.md
//! §4.4). If a track id is found with no matching album id, the track is
//! looked up to fill `albumId` in.

use std::collections::HashSet;

use regex::Regex;

use crate::model::MediaId;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilenameIds {
    pub album_id: Option<MediaId>,
    pub artist_id: Option<MediaId>,
    pub track_id: Option<MediaId>,
}

/// `album_id_of_track` resolves a track id to its album id, used to
/// backfill `albumId` when only a track id token was found.
pub fn ids_from_filename(
    stem: &str,
    album_ids: &HashSet<MediaId>,
    artist_ids: &HashSet<MediaId>,
    track_ids: &HashSet<MediaId>,
    album_id_of_track: impl Fn(&str) -> Option<MediaId>,
) -> FilenameIds {
    let token_re = Regex::new(r"[A-Za-z]-?[A-Za-z0-9]+").expect("static regex is valid");

    let mut ids = FilenameIds::default();
    for token in token_re.find_iter(stem).map(|m| m.as_str()) {
        if ids.album_id.is_none() && album_ids.contains(token) {
            ids.album_id = Some(token.to_string());
        } else if ids.artist_id.is_none() && artist_ids.contains(token) {
            ids.artist_id = Some(token.to_string());
        } else if ids.track_id.is_none() && track_ids.contains(token) {
            ids.track_id = Some(token.to_string());
        }
    }

    if ids.album_id.is_none() {
        if let Some(track_id) = &ids.track_id {
            ids.album_id = album_id_of_track(track_id);
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_classifies_known_tokens() {
        let albums: HashSet<MediaId> = ["album-1".to_string()].into_iter().collect();
        let artists: HashSet<MediaId> = ["artist-2".to_string()].into_iter().collect();
        let tracks: HashSet<MediaId> = ["track-3".to_string()].into_iter().collect();

        let ids = ids_from_filename("album-1_artist-2_track-3_final-mix", &albums, &artists, &tracks, |_| None);

        assert_eq!(ids.album_id.as_deref(), Some("album-1"));
        assert_eq!(ids.artist_id.as_deref(), Some("artist-2"));
        assert_eq!(ids.track_id.as_deref(), Some("track-3"));
    }

    #[test]
    fn backfills_album_id_from_track_when_missing() {
        let albums: HashSet<MediaId> = HashSet::new();
        let artists: HashSet<MediaId> = HashSet::new();
        let tracks: HashSet<MediaId> = ["track-3".to_string()].into_iter().collect();

        let ids = ids_from_filename("track-3", &albums, &artists, &tracks, |id| {
            assert_eq!(id, "track-3");
            Some("album-9".to_string())
        });

        assert_eq!(ids.track_id.as_deref(), Some("track-3"));
        assert_eq!(ids.album_id.as_deref(), Some("album-9"));
    }
}
