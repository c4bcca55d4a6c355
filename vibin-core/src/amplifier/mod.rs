//! Amplifier adapter: normalizes either a Hegel TCP amplifier or a Cambridge
//! StreamMagic preamp/control-bus zone into the same `AmplifierState` and a
//! common command surface. Grounded on `reconnect::TcpLineWorker` for the
//! Hegel line protocol and on `reconnect::WebSocketWorker` (shared with the
//! streamer adapter) for the StreamMagic variant.

mod hegel;
mod streammagic;

pub use hegel::HegelAdapter;
pub use streammagic::{StreamMagicAmpMode, StreamMagicAmplifierAdapter};

use std::sync::Arc;

use crate::errors::{Result, VibinError};
use crate::model::AmplifierState;

pub type UpdateSink = Arc<dyn Fn(crate::model::UpdateMessageType, serde_json::Value) + Send + Sync>;

/// Either concrete amplifier implementation, behind one command surface.
pub enum AmplifierAdapter {
    Hegel(HegelAdapter),
    StreamMagic(StreamMagicAmplifierAdapter),
}

impl AmplifierAdapter {
    pub fn snapshot_state(&self) -> AmplifierState {
        match self {
            AmplifierAdapter::Hegel(a) => a.snapshot_state(),
            AmplifierAdapter::StreamMagic(a) => a.snapshot_state(),
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        match self {
            AmplifierAdapter::Hegel(a) => a.set_power(on).await,
            AmplifierAdapter::StreamMagic(a) => a.set_power(on).await,
        }
    }

    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        match self {
            AmplifierAdapter::Hegel(a) => a.set_mute(muted).await,
            AmplifierAdapter::StreamMagic(a) => a.set_mute(muted).await,
        }
    }

    pub async fn set_volume(&self, normalized: f32) -> Result<()> {
        match self {
            AmplifierAdapter::Hegel(a) => a.set_volume(normalized).await,
            AmplifierAdapter::StreamMagic(a) => a.set_volume(normalized).await,
        }
    }

    pub async fn volume_up_down(&self, up: bool) -> Result<()> {
        match self {
            AmplifierAdapter::Hegel(a) => a.volume_up_down(up).await,
            AmplifierAdapter::StreamMagic(a) => a.volume_up_down(up).await,
        }
    }

    pub async fn set_source(&self, source: &str) -> Result<()> {
        match self {
            AmplifierAdapter::Hegel(a) => a.set_source(source).await,
            AmplifierAdapter::StreamMagic(_) => Err(VibinError::InputError("this amplifier does not support source selection".to_string())),
        }
    }

    pub async fn shutdown(self) {
        match self {
            AmplifierAdapter::Hegel(a) => a.shutdown().await,
            AmplifierAdapter::StreamMagic(a) => a.shutdown().await,
        }
    }
}
