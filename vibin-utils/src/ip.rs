use std::net::UdpSocket;

/// Guesses the local IP address that would be used for outbound traffic.
///
/// Opens a UDP socket and "connects" it to a public address without sending
/// any packet; the OS picks the interface it would route through, and we
/// read that back. Falls back to `127.0.0.1` if anything along the way
/// fails (no route, no interfaces, sandboxed network namespace, ...).
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Lists all non-loopback IPv4 addresses across local network interfaces,
/// used when joining the SSDP multicast group on every usable interface.
pub fn non_loopback_ips() -> Vec<std::net::Ipv4Addr> {
    let Ok(interfaces) = get_if_addrs::get_if_addrs() else {
        return Vec::new();
    };

    interfaces
        .into_iter()
        .filter_map(|iface| match iface.ip() {
            std::net::IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_local_ip_never_panics() {
        let ip = guess_local_ip();
        assert!(!ip.is_empty());
    }
}
