use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best guess at the host's LAN IPv4 address, or "unknown".
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn detect_local_ip() -> String {
    probe_local_ipv4()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn probe_local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_local_ip_is_ipv4_or_unknown() {
        let ip = detect_local_ip();
        assert!(ip == "unknown" || ip.parse::<Ipv4Addr>().is_ok());
        assert_ne!(ip, "127.0.0.1");
    }
}
