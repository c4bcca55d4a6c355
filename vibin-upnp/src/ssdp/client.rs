use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};

use super::{DEFAULT_MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT};

/// An SSDP announcement or search response relevant to a control point.
#[derive(Debug, Clone)]
pub enum SsdpEvent {
    Alive {
        usn: String,
        nt: String,
        location: String,
        server: String,
        max_age: u32,
        from: SocketAddr,
    },
    ByeBye {
        usn: String,
        nt: String,
        from: SocketAddr,
    },
    SearchResponse {
        usn: String,
        st: String,
        location: String,
        server: String,
        max_age: u32,
        from: SocketAddr,
    },
}

impl SsdpEvent {
    /// The device's description-document URL, when this event carries one.
    pub fn location(&self) -> Option<&str> {
        match self {
            SsdpEvent::Alive { location, .. } => Some(location),
            SsdpEvent::SearchResponse { location, .. } => Some(location),
            SsdpEvent::ByeBye { .. } => None,
        }
    }

    pub fn usn(&self) -> &str {
        match self {
            SsdpEvent::Alive { usn, .. } => usn,
            SsdpEvent::ByeBye { usn, .. } => usn,
            SsdpEvent::SearchResponse { usn, .. } => usn,
        }
    }
}

/// A control-point SSDP client: sends M-SEARCH and listens for unicast
/// responses plus multicast NOTIFY traffic. Binds an ephemeral port rather
/// than 1900, since a control point that also bound the well-known port
/// would have the kernel load-balance device traffic between itself and any
/// SSDP server running in the same process.
pub struct SsdpClient {
    socket: Arc<UdpSocket>,
}

impl SsdpClient {
    pub fn new() -> std::io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;
        let bind_addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_read_timeout(Some(Duration::from_millis(250)))?;
        socket.set_multicast_loop_v4(true)?;

        for iface in get_if_addrs::get_if_addrs()? {
            if let IpAddr::V4(ipv4) = iface.ip() {
                if ipv4.is_loopback() {
                    continue;
                }
                if let Err(err) = socket.join_multicast_v4(&SSDP_MULTICAST_ADDR.parse().unwrap(), &ipv4) {
                    warn!(%ipv4, %err, "SSDP: failed to join multicast group on interface");
                }
            }
        }

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn send_msearch(&self, search_target: &str, mx: u32) -> std::io::Result<()> {
        let mx = mx.max(1);
        let msg = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {SSDP_MULTICAST_ADDR}:{SSDP_PORT}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: {mx}\r\n\
             ST: {search_target}\r\n\
             USER-AGENT: vibin SSDP client\r\n\
             \r\n"
        );

        let addr: SocketAddr = format!("{SSDP_MULTICAST_ADDR}:{SSDP_PORT}").parse().unwrap();
        self.socket.send_to(msg.as_bytes(), addr)?;
        debug!(st = search_target, mx, "sent M-SEARCH");
        Ok(())
    }

    /// Sends an M-SEARCH and collects every response received within
    /// `timeout`. Used for one-shot device discovery rather than a
    /// long-running control point.
    pub fn search(&self, search_target: &str, timeout: Duration) -> std::io::Result<Vec<SsdpEvent>> {
        self.send_msearch(search_target, timeout.as_secs().max(1) as u32)?;

        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        let mut buf = [0u8; 8192];

        while Instant::now() < deadline {
            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(event) = parse_message(&data, from) {
                        events.push(event);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err),
            }
        }

        Ok(events)
    }

    /// Runs forever, invoking `on_event` for every Alive/ByeBye/SearchResponse
    /// message received. Intended to run on its own blocking thread.
    pub fn run_event_loop<F>(&self, mut on_event: F) -> !
    where
        F: FnMut(SsdpEvent) + Send + 'static,
    {
        let socket = Arc::clone(&self.socket);
        let mut buf = [0u8; 8192];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(event) = parse_message(&data, from) {
                        on_event(event);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(err) => warn!(%err, "SSDP read error"),
            }
        }
    }
}

fn parse_message(data: &str, from: SocketAddr) -> Option<SsdpEvent> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();
    let headers = parse_headers(lines);

    let result = if upper.starts_with("NOTIFY ") {
        handle_notify(&headers, from)
    } else if upper.starts_with("HTTP/") && upper.contains(" 200 ") {
        handle_search_response(&headers, from)
    } else {
        None
    };

    if result.is_none() {
        trace!(%from, "unparsed SSDP message: {}", data);
    }
    result
}

fn handle_notify(headers: &HashMap<String, String>, from: SocketAddr) -> Option<SsdpEvent> {
    let nts = headers.get("NTS")?.to_ascii_lowercase();
    let nt = headers.get("NT")?.to_string();
    let usn = headers.get("USN")?.to_string();

    match nts.as_str() {
        "ssdp:alive" => {
            let location = headers.get("LOCATION")?.to_string();
            let server = headers
                .get("SERVER")
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            let max_age = parse_max_age(headers.get("CACHE-CONTROL"));
            Some(SsdpEvent::Alive {
                usn,
                nt,
                location,
                server,
                max_age,
                from,
            })
        }
        "ssdp:byebye" => Some(SsdpEvent::ByeBye { usn, nt, from }),
        _ => None,
    }
}

fn handle_search_response(headers: &HashMap<String, String>, from: SocketAddr) -> Option<SsdpEvent> {
    let st = headers.get("ST")?.to_string();
    let usn = headers.get("USN")?.to_string();
    let location = headers.get("LOCATION")?.to_string();
    let server = headers
        .get("SERVER")
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());
    let max_age = parse_max_age(headers.get("CACHE-CONTROL"));

    Some(SsdpEvent::SearchResponse {
        usn,
        st,
        location,
        server,
        max_age,
        from,
    })
}

fn parse_headers<'a, I: Iterator<Item = &'a str>>(lines: I) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_ascii_uppercase();
            let value = line[colon + 1..].trim().to_string();
            if !name.is_empty() && !value.is_empty() {
                headers.insert(name, value);
            }
        }
    }
    headers
}

fn parse_max_age(value: Option<&String>) -> u32 {
    let Some(v) = value else {
        return DEFAULT_MAX_AGE;
    };
    let lower = v.to_ascii_lowercase();
    let Some(idx) = lower.find("max-age") else {
        return DEFAULT_MAX_AGE;
    };
    let after_key = &v[idx + "max-age".len()..];
    let after_eq = after_key.trim_start().trim_start_matches('=').trim_start();
    let digits: String = after_eq.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(DEFAULT_MAX_AGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alive_notify() {
        let from: SocketAddr = "192.168.1.50:1900".parse().unwrap();
        let msg = "NOTIFY * HTTP/1.1\r\n\
            HOST: 239.255.255.250:1900\r\n\
            NT: urn:schemas-upnp-org:device:MediaRenderer:1\r\n\
            NTS: ssdp:alive\r\n\
            USN: uuid:abc::urn:schemas-upnp-org:device:MediaRenderer:1\r\n\
            LOCATION: http://192.168.1.50:80/desc.xml\r\n\
            SERVER: Linux/1.0 UPnP/1.0 StreamMagic/1\r\n\
            CACHE-CONTROL: max-age=1800\r\n\r\n";

        let event = parse_message(msg, from).unwrap();
        match event {
            SsdpEvent::Alive { location, max_age, .. } => {
                assert_eq!(location, "http://192.168.1.50:80/desc.xml");
                assert_eq!(max_age, 1800);
            }
            other => panic!("expected Alive, got {other:?}"),
        }
    }

    #[test]
    fn parses_search_response() {
        let from: SocketAddr = "192.168.1.51:1900".parse().unwrap();
        let msg = "HTTP/1.1 200 OK\r\n\
            ST: urn:schemas-upnp-org:service:ContentDirectory:1\r\n\
            USN: uuid:def::urn:schemas-upnp-org:service:ContentDirectory:1\r\n\
            LOCATION: http://192.168.1.51:80/desc.xml\r\n\
            SERVER: Linux/1.0 UPnP/1.0 Asset/1\r\n\r\n";

        let event = parse_message(msg, from).unwrap();
        assert!(matches!(event, SsdpEvent::SearchResponse { .. }));
    }

    #[test]
    fn ignores_malformed_messages() {
        let from: SocketAddr = "192.168.1.52:1900".parse().unwrap();
        assert!(parse_message("garbage\r\n\r\n", from).is_none());
    }
}
