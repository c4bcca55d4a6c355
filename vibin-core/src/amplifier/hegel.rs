//! Hegel amplifier: line-oriented TCP protocol on port 50001. Framing is
//! `-<cmd>.<param>\r`; responses echo the command as `-<cmd>.<value>`, or
//! `e.<...>` on a device-reported error. The amplifier drops the connection
//! unless a drop-timer refresh (`r.3`) arrives at least every two minutes;
//! this adapter sends one on that schedule.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::errors::{Result, VibinError};
use crate::model::{AmplifierAction, AmplifierState, AudioSources, MuteState, PowerState, UpdateMessageType};
use crate::reconnect::{TcpLineWorker, TcpOnConnect, TcpOnDisconnect, TcpOnLine, TcpOutbound};

use super::UpdateSink;

const DROP_TIMER_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Default, Clone)]
struct HegelInner {
    power: Option<PowerState>,
    volume: Option<u8>,
    mute: Option<MuteState>,
    input: Option<u8>,
}

pub struct HegelAdapter {
    name: String,
    state: Arc<RwLock<HegelInner>>,
    outbound: Arc<RwLock<Option<TcpOutbound>>>,
    worker: Option<TcpLineWorker>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

impl HegelAdapter {
    pub fn spawn(name: String, addr: String, updates: UpdateSink) -> Result<Self> {
        let state = Arc::new(RwLock::new(HegelInner::default()));
        let outbound: Arc<RwLock<Option<TcpOutbound>>> = Arc::new(RwLock::new(None));

        let on_connect: TcpOnConnect = {
            let outbound = Arc::clone(&outbound);
            Box::new(move |out: TcpOutbound| {
                for cmd in ["p", "i", "v", "m"] {
                    out.send(format!("-{cmd}.?\r").into_bytes());
                }
                *outbound.write() = Some(out);
            })
        };

        let on_line: TcpOnLine = {
            let state = Arc::clone(&state);
            let updates = Arc::clone(&updates);
            let name = name.clone();
            Box::new(move |line: Vec<u8>| {
                if let Ok(text) = String::from_utf8(line) {
                    handle_line(&text, &name, &state, &updates);
                }
            })
        };

        let on_disconnect: TcpOnDisconnect = {
            let outbound = Arc::clone(&outbound);
            Box::new(move || {
                *outbound.write() = None;
                debug!("hegel amplifier disconnected");
            })
        };

        let worker = TcpLineWorker::spawn(addr, b'\r', on_connect, on_line, on_disconnect);

        let timer_outbound = Arc::clone(&outbound);
        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(DROP_TIMER_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Some(out) = timer_outbound.read().clone() {
                    out.send(b"-r.3\r".to_vec());
                }
            }
        });

        Ok(HegelAdapter {
            name,
            state,
            outbound,
            worker: Some(worker),
            timer: Some(timer),
        })
    }

    pub fn snapshot_state(&self) -> AmplifierState {
        let inner = self.state.read();
        let mut supported_actions = BTreeSet::new();
        supported_actions.insert(AmplifierAction::Power);
        supported_actions.insert(AmplifierAction::Volume);
        supported_actions.insert(AmplifierAction::Mute);
        supported_actions.insert(AmplifierAction::VolumeUpDown);
        supported_actions.insert(AmplifierAction::Source);

        AmplifierState {
            name: self.name.clone(),
            supported_actions,
            power: inner.power,
            mute: inner.mute,
            volume: inner.volume.map(|v| v as f32 / 100.0),
            sources: AudioSources::default(),
        }
    }

    fn send(&self, cmd: &str, param: &str) -> Result<()> {
        match self.outbound.read().as_ref() {
            Some(out) => {
                out.send(format!("-{cmd}.{param}\r").into_bytes());
                Ok(())
            }
            None => Err(VibinError::DeviceError("hegel amplifier is not connected".to_string())),
        }
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.send("p", if on { "1" } else { "0" })
    }

    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.send("m", if muted { "1" } else { "0" })
    }

    pub async fn set_volume(&self, normalized: f32) -> Result<()> {
        let value = (normalized.clamp(0.0, 1.0) * 100.0).round() as u8;
        self.send("v", &value.to_string())
    }

    pub async fn volume_up_down(&self, up: bool) -> Result<()> {
        self.send("v", if up { "u" } else { "d" })
    }

    pub async fn set_source(&self, source: &str) -> Result<()> {
        let input: u8 = source.parse().map_err(|_| VibinError::InputError(format!("invalid hegel input '{source}': expected 1-9")))?;
        if !(1..=9).contains(&input) {
            return Err(VibinError::InputError(format!("hegel input {input} out of range 1-9")));
        }
        self.send("i", &input.to_string())
    }

    pub async fn shutdown(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(worker) = self.worker.take() {
            worker.stop().await;
        }
    }
}

fn handle_line(text: &str, name: &str, state: &Arc<RwLock<HegelInner>>, updates: &UpdateSink) {
    let text = text.trim();
    let Some(body) = text.strip_prefix('-') else {
        warn!(line = text, "malformed hegel response");
        return;
    };
    let Some((cmd, value)) = body.split_once('.') else {
        warn!(line = text, "malformed hegel response");
        return;
    };

    if cmd == "e" {
        warn!(error = value, "hegel amplifier reported an error");
        return;
    }

    let mut inner = state.write();
    match cmd {
        "p" => inner.power = Some(match value { "1" => PowerState::On, "0" => PowerState::Off, _ => PowerState::Unknown }),
        "v" => {
            let Ok(volume) = value.parse() else { return };
            inner.volume = Some(volume);
        }
        "m" => inner.mute = Some(match value { "1" => MuteState::On, "0" => MuteState::Off, _ => MuteState::Unknown }),
        "i" => {
            let Ok(input) = value.parse() else { return };
            inner.input = Some(input);
        }
        _ => {
            debug!(cmd, value, "ignoring unrecognized hegel response");
            return;
        }
    }

    let supported = {
        let mut s = BTreeSet::new();
        s.insert(AmplifierAction::Power);
        s.insert(AmplifierAction::Volume);
        s.insert(AmplifierAction::Mute);
        s.insert(AmplifierAction::VolumeUpDown);
        s.insert(AmplifierAction::Source);
        s
    };
    let snapshot = AmplifierState {
        name: name.to_string(),
        supported_actions: supported,
        power: inner.power,
        mute: inner.mute,
        volume: inner.volume.map(|v| v as f32 / 100.0),
        sources: AudioSources::default(),
    };
    drop(inner);

    updates(UpdateMessageType::System, serde_json::to_value(snapshot).unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_op_sink() -> UpdateSink {
        Arc::new(|_, _| {})
    }

    #[test]
    fn handle_line_parses_power_and_volume() {
        let state = Arc::new(RwLock::new(HegelInner::default()));
        let updates = no_op_sink();

        handle_line("-p.1\r", "amp", &state, &updates);
        handle_line("-v.42", "amp", &state, &updates);

        let inner = state.read();
        assert_eq!(inner.power, Some(PowerState::On));
        assert_eq!(inner.volume, Some(42));
    }

    #[test]
    fn handle_line_ignores_device_errors() {
        let state = Arc::new(RwLock::new(HegelInner::default()));
        let updates = no_op_sink();

        handle_line("-e.unsupported\r", "amp", &state, &updates);

        assert_eq!(state.read().power, None);
    }
}
