//! DIDL-Lite is the XML dialect UPnP ContentDirectory services use to
//! describe media items, and the payload a MediaRenderer expects when asked
//! to queue a piece of media. This crate parses it (media-server adapter)
//! and builds it (streamer adapter, when pushing a queue entry).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DidlError {
    #[error("failed to parse DIDL-Lite XML: {0}")]
    Parse(#[from] quick_xml::de::DeError),
    #[error("failed to serialize DIDL-Lite XML: {0}")]
    Serialize(#[from] quick_xml::se::SeError),
}

/// Root `<DIDL-Lite>` document: zero or more containers and items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlLite {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,
    #[serde(rename = "@xmlns:dc", default)]
    pub xmlns_dc: String,
    #[serde(rename = "@xmlns:upnp", default)]
    pub xmlns_upnp: String,
    #[serde(rename = "container", default)]
    pub containers: Vec<DidlContainer>,
    #[serde(rename = "item", default)]
    pub items: Vec<DidlItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DidlContainer {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@parentID", default)]
    pub parent_id: String,
    #[serde(rename = "@childCount", default)]
    pub child_count: Option<u32>,
    #[serde(rename = "@restricted", default)]
    pub restricted: Option<String>,
    #[serde(rename = "title", default)]
    pub title: String,
    #[serde(rename = "class", default)]
    pub class: String,
    #[serde(rename = "artist", default)]
    pub artist: Option<String>,
    #[serde(rename = "genre", default)]
    pub genre: Option<String>,
    #[serde(rename = "date", default)]
    pub date: Option<String>,
    #[serde(rename = "creator", default)]
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DidlItem {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@parentID", default)]
    pub parent_id: String,
    #[serde(rename = "@restricted", default)]
    pub restricted: Option<String>,
    #[serde(rename = "title", default)]
    pub title: String,
    #[serde(rename = "class", default)]
    pub class: String,
    #[serde(rename = "creator", default)]
    pub creator: Option<String>,
    #[serde(rename = "artist", default)]
    pub artist: Option<String>,
    #[serde(rename = "album", default)]
    pub album: Option<String>,
    #[serde(rename = "originalTrackNumber", default)]
    pub original_track_number: Option<u32>,
    #[serde(rename = "albumArtURI", default)]
    pub album_art_uri: Option<String>,
    #[serde(rename = "res", default)]
    pub res: Vec<DidlResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DidlResource {
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: String,
    #[serde(rename = "@duration", default)]
    pub duration: Option<String>,
    #[serde(rename = "$text", default)]
    pub uri: String,
}

const NS_DIDL: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_UPNP: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";

/// Parses a DIDL-Lite XML fragment (as returned by a `Browse` SOAP call, or
/// embedded in a UPnP `AVTransportURIMetaData` argument).
pub fn parse(xml: &str) -> Result<DidlLite, DidlError> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Builds a single-item DIDL-Lite document suitable for `SetAVTransportURI`
/// / `AVTransportURIMetaData`-style arguments, describing one track to be
/// enqueued on a streamer.
pub struct TrackMetadata<'a> {
    pub media_id: &'a str,
    pub title: &'a str,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub track_number: Option<u32>,
    pub audio_url: &'a str,
    pub protocol_info: &'a str,
}

pub fn build_track_didl(track: &TrackMetadata<'_>) -> Result<String, DidlError> {
    let doc = DidlLite {
        xmlns: NS_DIDL.to_string(),
        xmlns_dc: NS_DC.to_string(),
        xmlns_upnp: NS_UPNP.to_string(),
        containers: Vec::new(),
        items: vec![DidlItem {
            id: track.media_id.to_string(),
            parent_id: "-1".to_string(),
            restricted: Some("1".to_string()),
            title: track.title.to_string(),
            class: "object.item.audioItem.musicTrack".to_string(),
            creator: track.artist.map(str::to_string),
            artist: track.artist.map(str::to_string),
            album: track.album.map(str::to_string),
            original_track_number: track.track_number,
            album_art_uri: None,
            res: vec![DidlResource {
                protocol_info: track.protocol_info.to_string(),
                duration: None,
                uri: track.audio_url.to_string(),
            }],
        }],
    };

    Ok(quick_xml::se::to_string(&doc)?)
}

/// Percent-encodes a DIDL-Lite payload for embedding in a streamer HTTP
/// query string, escaping everything outside the unreserved RFC 3986 set.
pub fn percent_encode_didl(didl_xml: &str) -> String {
    let mut out = String::with_capacity(didl_xml.len() * 2);
    for byte in didl_xml.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_parses_a_track_item() {
        let didl = build_track_didl(&TrackMetadata {
            media_id: "media-123",
            title: "Song Title",
            artist: Some("Some Artist"),
            album: Some("Some Album"),
            track_number: Some(4),
            audio_url: "http://server/track.flac",
            protocol_info: "http-get:*:audio/flac:*",
        })
        .unwrap();

        assert!(didl.contains("Song Title"));

        let parsed = parse(&didl).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].title, "Song Title");
        assert_eq!(parsed.items[0].original_track_number, Some(4));
    }

    #[test]
    fn percent_encodes_reserved_characters() {
        let encoded = percent_encode_didl("<a b=\"c\">");
        assert!(!encoded.contains('<'));
        assert!(!encoded.contains(' '));
        assert!(encoded.contains("%3C"));
    }
}
