//! GENA event subscription lifecycle: SUBSCRIBE, periodic renewal, and
//! UNSUBSCRIBE. Renewal runs on its own tokio task so a subscription never
//! silently lapses while its owning adapter is alive, matching GENA's
//! "Second-N" lease semantics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Minimum gap kept between a renewal and the lease's actual expiry.
const RENEWAL_BUFFER: Duration = Duration::from_secs(10);
/// Floor on the sleep between renewals, in case a device grants an
/// unreasonably short lease.
const MIN_RENEWAL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    Established { sid: String, timeout: Duration },
    Renewed { sid: String, timeout: Duration },
    /// The device returned 412 Precondition Failed on renewal (lease already
    /// expired device-side); a fresh SUBSCRIBE was issued and succeeded.
    Resubscribed { sid: String, timeout: Duration },
    /// Renewal failed and no further attempts will be made.
    Failed { reason: String },
}

pub type EventCallback = Box<dyn Fn(SubscriptionEvent) + Send + Sync + 'static>;

/// Handle to a running subscription-renewal task. Dropping this without
/// calling [`SubscriptionHandle::unsubscribe`] leaves the renewal loop
/// running — it stops itself if cancelled or if the device drops it
/// permanently (a renewal failure with no SID to fall back on).
pub struct SubscriptionHandle {
    sid: Arc<RwLock<Option<String>>>,
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub async fn current_sid(&self) -> Option<String> {
        self.sid.read().await.clone()
    }

    /// Stops the renewal loop and attempts a best-effort UNSUBSCRIBE.
    pub async fn unsubscribe(self, client: &Client, event_url: &str) {
        self.cancel.store(true, Ordering::SeqCst);
        self.task.abort();

        if let Some(sid) = self.sid.read().await.clone() {
            let method = Method::from_bytes(b"UNSUBSCRIBE").expect("valid custom HTTP method");
            let result = client
                .request(method, event_url)
                .header("SID", sid)
                .send()
                .await;
            if let Err(err) = result {
                warn!(%event_url, %err, "UNSUBSCRIBE request failed");
            }
        }
    }
}

/// Starts a GENA subscription against `event_url` and keeps it alive by
/// renewing roughly every `granted_timeout - RENEWAL_BUFFER`, where
/// `granted_timeout` is whatever the device actually returned in its last
/// `TIMEOUT` response header (which may be shorter than `requested_timeout`).
/// `callback_url` is the server-reachable URL the device should POST NOTIFY
/// requests to.
pub struct SubscriptionLoop;

impl SubscriptionLoop {
    pub fn start(
        client: Client,
        event_url: String,
        callback_url: String,
        requested_timeout: Duration,
        on_event: EventCallback,
    ) -> SubscriptionHandle {
        let sid = Arc::new(RwLock::new(None));
        let cancel = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_loop(
            client,
            event_url,
            callback_url,
            requested_timeout,
            Arc::clone(&sid),
            Arc::clone(&cancel),
            on_event,
        ));

        SubscriptionHandle { sid, cancel, task }
    }
}

async fn run_loop(
    client: Client,
    event_url: String,
    callback_url: String,
    requested_timeout: Duration,
    sid_slot: Arc<RwLock<Option<String>>>,
    cancel: Arc<AtomicBool>,
    on_event: EventCallback,
) {
    // Tracks the device's actually-granted lease, not the client's request —
    // a device is free to cap TIMEOUT below what was asked for, and sleeping
    // by the requested value in that case would let the lease lapse silently.
    let mut granted_timeout = requested_timeout;

    match subscribe(&client, &event_url, &callback_url, requested_timeout).await {
        Ok((sid, timeout)) => {
            granted_timeout = timeout;
            *sid_slot.write().await = Some(sid.clone());
            on_event(SubscriptionEvent::Established {
                sid,
                timeout,
            });
        }
        Err(err) => {
            on_event(SubscriptionEvent::Failed {
                reason: err.to_string(),
            });
            return;
        }
    }

    loop {
        {
            let sid = sid_slot.read().await;
            if sid.is_none() || cancel.load(Ordering::SeqCst) {
                return;
            }
        }

        let sleep_for = granted_timeout.saturating_sub(RENEWAL_BUFFER).max(MIN_RENEWAL_INTERVAL);
        tokio::time::sleep(sleep_for).await;

        if cancel.load(Ordering::SeqCst) {
            return;
        }

        let current_sid = sid_slot.read().await.clone();
        let Some(current_sid) = current_sid else {
            return;
        };

        match renew(&client, &event_url, &current_sid, requested_timeout).await {
            Ok(RenewOutcome::Renewed(new_timeout)) => {
                granted_timeout = new_timeout;
                on_event(SubscriptionEvent::Renewed {
                    sid: current_sid,
                    timeout: new_timeout,
                });
            }
            Ok(RenewOutcome::Expired) => {
                debug!(sid = %current_sid, "subscription expired device-side, resubscribing");
                match subscribe(&client, &event_url, &callback_url, requested_timeout).await {
                    Ok((sid, new_timeout)) => {
                        granted_timeout = new_timeout;
                        *sid_slot.write().await = Some(sid.clone());
                        on_event(SubscriptionEvent::Resubscribed {
                            sid,
                            timeout: new_timeout,
                        });
                    }
                    Err(err) => {
                        on_event(SubscriptionEvent::Failed {
                            reason: err.to_string(),
                        });
                        return;
                    }
                }
            }
            Err(err) => {
                on_event(SubscriptionEvent::Failed {
                    reason: err.to_string(),
                });
                return;
            }
        }
    }
}

enum RenewOutcome {
    Renewed(Duration),
    Expired,
}

async fn subscribe(
    client: &Client,
    event_url: &str,
    callback_url: &str,
    requested_timeout: Duration,
) -> Result<(String, Duration), reqwest::Error> {
    let method = Method::from_bytes(b"SUBSCRIBE").expect("valid custom HTTP method");
    let response = client
        .request(method, event_url)
        .header("CALLBACK", format!("<{callback_url}>"))
        .header("NT", "upnp:event")
        .header("TIMEOUT", format!("Second-{}", requested_timeout.as_secs()))
        .send()
        .await?;

    let sid = response
        .headers()
        .get("SID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let timeout = parse_timeout_header(response.headers().get("TIMEOUT")).unwrap_or(requested_timeout);

    Ok((sid, timeout))
}

async fn renew(
    client: &Client,
    event_url: &str,
    sid: &str,
    requested_timeout: Duration,
) -> Result<RenewOutcome, reqwest::Error> {
    let method = Method::from_bytes(b"SUBSCRIBE").expect("valid custom HTTP method");
    let response = client
        .request(method, event_url)
        .header("SID", sid)
        .header("TIMEOUT", format!("Second-{}", requested_timeout.as_secs()))
        .send()
        .await?;

    if response.status() == StatusCode::PRECONDITION_FAILED {
        return Ok(RenewOutcome::Expired);
    }

    let timeout = parse_timeout_header(response.headers().get("TIMEOUT")).unwrap_or(requested_timeout);
    Ok(RenewOutcome::Renewed(timeout))
}

fn parse_timeout_header(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    let value = value?.to_str().ok()?;
    let secs = value.strip_prefix("Second-")?;
    secs.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_timeout_header() {
        let header = reqwest::header::HeaderValue::from_static("Second-1800");
        assert_eq!(parse_timeout_header(Some(&header)), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let header = reqwest::header::HeaderValue::from_static("Second-infinite");
        assert_eq!(parse_timeout_header(Some(&header)), None);
    }

    #[test]
    fn renewal_buffer_never_exceeds_a_short_lease() {
        let timeout = Duration::from_secs(8);
        let sleep_for = timeout.saturating_sub(RENEWAL_BUFFER).max(MIN_RENEWAL_INTERVAL);
        assert_eq!(sleep_for, MIN_RENEWAL_INTERVAL);
    }
}
