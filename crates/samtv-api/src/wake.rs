// Wake-on-LAN
//
// A magic packet is 6 bytes of 0xFF followed by the target MAC repeated
// 16 times, broadcast over UDP. Nothing answers it; the caller confirms
// the wake by probing the status endpoint afterwards.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::Error;

const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

// ── MacAddress ───────────────────────────────────────────────────────

/// Hardware address, parsed from colon-, dash-separated or bare hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The wake packet addressed to this MAC.
    pub fn magic_packet(&self) -> [u8; MAGIC_PACKET_LEN] {
        let mut packet = [0xFF; MAGIC_PACKET_LEN];
        for chunk in packet[6..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        if hex.len() != 12 || !hex.is_ascii() {
            return Err(Error::InvalidMac(s.to_owned()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pair = hex
                .get(i * 2..i * 2 + 2)
                .ok_or_else(|| Error::InvalidMac(s.to_owned()))?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| Error::InvalidMac(s.to_owned()))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

// ── WakeConfig ───────────────────────────────────────────────────────

/// Where and how often the magic packet is sent.
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Broadcast destination. Default: `255.255.255.255:9`.
    pub target: SocketAddr,
    /// Copies sent per wake signal. Default: 3.
    pub count: u32,
    /// Gap between copies. Default: 100ms.
    pub interval: Duration,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, 9)),
            count: 3,
            interval: Duration::from_millis(100),
        }
    }
}

/// Broadcast a wake signal for `mac`.
pub async fn wake(mac: &MacAddress, config: &WakeConfig) -> Result<(), Error> {
    let bind: SocketAddr = match config.target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.set_broadcast(true)?;

    let packet = mac.magic_packet();
    for i in 0..config.count {
        if i > 0 {
            tokio::time::sleep(config.interval).await;
        }
        socket.send_to(&packet, config.target).await?;
    }

    debug!(mac = %mac, target = %config.target, count = config.count, "wake packet sent");
    Ok(())
}
