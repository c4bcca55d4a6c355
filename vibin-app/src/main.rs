//! `vibin`: discovers the streamer, optional media server, and optional
//! amplifier, wires them into a `Hub`, and serves `vibin-server` on top of
//! it. Grounded on `PMOMusic/src/main.rs`'s sequential startup narration
//! (minus its UPnP-server-hosting phases, which this binary's device side
//! doesn't need) and on the CLI surface of `vibin/cli/cli.py`'s `serve`
//! command.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use vibin_core::amplifier::{AmplifierAdapter, HegelAdapter, StreamMagicAmpMode, StreamMagicAmplifierAdapter};
use vibin_core::discovery::{classify_media_server, classify_streamer, resolve_media_server, resolve_streamer, MediaServerAdapterKind, StreamerAdapterKind};
use vibin_core::favorites::FavoritesManager;
use vibin_core::links::LinksManager;
use vibin_core::lyrics::LyricsManager;
use vibin_core::mediaserver::MediaServerAdapter;
use vibin_core::model::VibinSettings;
use vibin_core::playlists::PlaylistReconciler;
use vibin_core::streamer::StreamerAdapter;
use vibin_core::{Hub, VibinError};
use vibin_config::Store;

/// A headless music-control server for a Cambridge Audio StreamMagic streamer.
#[derive(Debug, Parser)]
#[command(name = "vibin", version)]
struct Cli {
    /// Host to listen on.
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "VIBIN_HOST")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, short, default_value_t = 7669, env = "VIBIN_PORT")]
    port: u16,

    /// Streamer (hostname, UPnP friendly name, or UPnP location URL).
    #[arg(long, short, env = "VIBIN_STREAMER")]
    streamer: Option<String>,

    /// Media server (UPnP friendly name, or UPnP location URL).
    #[arg(long, short, env = "VIBIN_MEDIA")]
    media: Option<String>,

    /// Ignore any local media server.
    #[arg(long, short = 'n')]
    no_media: bool,

    /// Amplifier: `hegel:<host>`, `streammagic:preamp:<host>`, or `streammagic:control-bus:<host>`.
    #[arg(long, short = 'a', env = "VIBIN_AMPLIFIER")]
    amplifier: Option<String>,

    /// UPnP discovery timeout, in seconds.
    #[arg(long, short = 't', default_value_t = 5, env = "VIBIN_DISCOVERY_TIMEOUT")]
    discovery_timeout: u64,

    /// Directory holding the persisted store (created if missing).
    #[arg(long, short = 'd', default_value = "./data", env = "VIBIN_DATA_DIR")]
    data_dir: PathBuf,

    /// Media-server folder path treated as "all albums".
    #[arg(long, default_value = "All Albums", env = "VIBIN_ALL_ALBUMS_PATH")]
    all_albums_path: String,

    /// Media-server folder path treated as "new albums".
    #[arg(long, default_value = "New Albums", env = "VIBIN_NEW_ALBUMS_PATH")]
    new_albums_path: String,

    /// Media-server folder path treated as "all artists".
    #[arg(long, default_value = "All Artists", env = "VIBIN_ALL_ARTISTS_PATH")]
    all_artists_path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "could not start vibin server");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

/// Exit codes per spec.md §6: 0 normal; nonzero for failed startup (could
/// not locate streamer, invalid proxy configuration, cannot create data dir).
fn exit_code_for(err: &VibinError) -> u8 {
    match err {
        VibinError::NotFound(_) | VibinError::DeviceError(_) => 2,
        VibinError::InputError(_) => 3,
        VibinError::MediaServerError(_) | VibinError::MissingDependencyError(_) => 4,
        VibinError::Internal(_) => 1,
    }
}

async fn run(cli: Cli) -> vibin_core::Result<()> {
    let http = reqwest::Client::new();
    let discovery_timeout = Duration::from_secs(cli.discovery_timeout);

    info!("searching for the streamer");
    let streamer_desc = resolve_streamer(&http, cli.streamer.as_deref(), discovery_timeout).await?;
    match classify_streamer(&streamer_desc)? {
        StreamerAdapterKind::CambridgeStreamMagic => {
            info!(name = streamer_desc.friendly_name, "found a Cambridge Audio StreamMagic streamer")
        }
    }

    let media_server = if cli.no_media {
        None
    } else {
        let media_input = cli.media.as_deref();
        match resolve_media_server(&http, media_input, discovery_timeout, &streamer_desc).await {
            Ok(Some(desc)) => match classify_media_server(&desc) {
                Ok(MediaServerAdapterKind::UpnpContentDirectory) => {
                    info!(name = desc.friendly_name, "found a media server");
                    Some(Arc::new(MediaServerAdapter::new(&desc, http.clone())?))
                }
                Err(err) => {
                    warn!(%err, "media server found but could not be classified, continuing without it");
                    None
                }
            },
            Ok(None) => {
                info!("no media server found, continuing without one");
                None
            }
            Err(err) => {
                warn!(%err, "media server discovery failed, continuing without one");
                None
            }
        }
    };

    std::fs::create_dir_all(&cli.data_dir).map_err(|err| VibinError::Internal(format!("could not create data dir {}: {err}", cli.data_dir.display())))?;
    let store = Arc::new(Store::open(cli.data_dir.join("vibin.json"))?);

    let settings = VibinSettings {
        all_albums_path: cli.all_albums_path,
        new_albums_path: cli.new_albums_path,
        all_artists_path: cli.all_artists_path,
    };

    // Streamer, playlists, and amplifier are all constructed before the Hub
    // exists, yet all three publish through the same sink the Hub owns.
    // Bridge the gap with a relay channel (the same mpsc-bridge idiom
    // `vibin-server::ws` uses for the Hub's own subscriber callbacks) and
    // drain it into `Hub::update_sink()` once the Hub is built.
    let (relay_tx, mut relay_rx) = tokio::sync::mpsc::unbounded_channel();
    let updates: vibin_core::streamer::UpdateSink = Arc::new(move |message_type, payload| {
        let _ = relay_tx.send((message_type, payload));
    });

    let streamer = Arc::new(StreamerAdapter::spawn(&streamer_desc, http.clone(), media_server.clone(), settings.all_albums_path.clone(), Arc::clone(&updates))?);

    let amplifier = match cli.amplifier.as_deref() {
        None => None,
        Some(spec) => Some(Arc::new(build_amplifier(spec, &http, Arc::clone(&updates)).await?)),
    };

    let playlists = Arc::new(PlaylistReconciler::new(Arc::clone(&store), Arc::clone(&streamer), Arc::clone(&updates)));
    playlists.check_on_startup()?;

    let favorites = Arc::new(FavoritesManager::new(Arc::clone(&store), media_server.clone()));
    let lyrics = Arc::new(LyricsManager::new(Arc::clone(&store), None));
    let links = Arc::new(LinksManager::new(Arc::clone(&store), None));

    let hub = Arc::new(Hub::new(streamer, media_server, amplifier, playlists, favorites, lyrics, links, store, settings));

    let sink = hub.update_sink();
    tokio::spawn(async move {
        while let Some((message_type, payload)) = relay_rx.recv().await {
            sink(message_type, payload);
        }
    });

    let bind_addr = SocketAddr::new(cli.host, cli.port);
    vibin_server::serve(hub, bind_addr).await.map_err(|err| VibinError::Internal(err.to_string()))
}

/// Parses `--amplifier` (`hegel:<host>`, `streammagic:preamp:<host>`, or
/// `streammagic:control-bus:<host>`); all three forms require an explicit
/// host, since a StreamMagic preamp/control-bus amplifier is not necessarily
/// hosted by the same device as the streamer.
async fn build_amplifier(spec: &str, http: &reqwest::Client, updates: vibin_core::amplifier::UpdateSink) -> vibin_core::Result<AmplifierAdapter> {
    let mut parts = spec.splitn(3, ':');
    let kind = parts.next().unwrap_or_default();

    match kind {
        "hegel" => {
            let addr = parts.next().ok_or_else(|| VibinError::InputError("hegel amplifier requires a host, e.g. hegel:192.168.1.50:50001".to_string()))?;
            info!(addr, "connecting to Hegel amplifier");
            Ok(AmplifierAdapter::Hegel(HegelAdapter::spawn("Hegel".to_string(), addr.to_string(), updates)?))
        }
        "streammagic" => {
            let mode = match parts.next() {
                Some("preamp") => StreamMagicAmpMode::Preamp,
                Some("control-bus") => StreamMagicAmpMode::ControlBus,
                other => return Err(VibinError::InputError(format!("unknown streammagic amplifier mode '{other:?}', expected preamp or control-bus"))),
            };
            let host = parts.next().ok_or_else(|| VibinError::InputError("streammagic amplifier requires a host, e.g. streammagic:preamp:192.168.1.50".to_string()))?;
            info!(host, ?mode, "connecting to StreamMagic amplifier");
            Ok(AmplifierAdapter::StreamMagic(StreamMagicAmplifierAdapter::spawn("StreamMagic".to_string(), host.to_string(), mode, http.clone(), updates).await?))
        }
        other => Err(VibinError::InputError(format!("unknown amplifier kind '{other}', expected hegel or streammagic"))),
    }
}
