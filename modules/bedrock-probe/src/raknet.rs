//! RakNet unconnected ping / pong.

use crate::{PingResponse, ProbeError};

pub const UNCONNECTED_PING: u8 = 0x01;
pub const UNCONNECTED_PONG: u8 = 0x1c;
pub const OFFLINE_MAGIC: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

pub fn build_unconnected_ping(time_ms: u64, client_guid: u64) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(33);
    pkt.push(UNCONNECTED_PING);
    pkt.extend_from_slice(&time_ms.to_be_bytes());
    pkt.extend_from_slice(&OFFLINE_MAGIC);
    pkt.extend_from_slice(&client_guid.to_be_bytes());
    pkt
}

/// Decode a pong and its `edition;motd;protocol;version;players;max;...` status string.
pub fn parse_unconnected_pong(data: &[u8]) -> Result<PingResponse, ProbeError> {
    // id(1) time(8) guid(8) magic(16) len(2)
    const HEADER: usize = 35;
    if data.len() < HEADER || data[0] != UNCONNECTED_PONG {
        return Err(ProbeError::Malformed("not an unconnected pong".into()));
    }
    if data[17..33] != OFFLINE_MAGIC {
        return Err(ProbeError::Malformed("bad offline magic".into()));
    }
    let len = u16::from_be_bytes([data[33], data[34]]) as usize;
    let body = data
        .get(HEADER..HEADER + len)
        .ok_or_else(|| ProbeError::Malformed("truncated status".into()))?;
    let status = String::from_utf8_lossy(body);
    let fields: Vec<&str> = status.split(';').collect();
    if fields.len() < 6 {
        return Err(ProbeError::Malformed(format!("short status: {}", status)));
    }
    let count = |s: &str| s.trim().parse::<u32>().map_err(|_| ProbeError::Malformed(format!("bad player count: {}", s)));
    Ok(PingResponse {
        hostname: fields[1].to_string(),
        version: fields[3].to_string(),
        numplayers: count(fields[4])?,
        maxplayers: count(fields[5])?,
    })
}

#[cfg(test)]
pub(crate) fn encode_pong(server_guid: u64, status: &str) -> Vec<u8> {
    let mut pkt = vec![UNCONNECTED_PONG];
    pkt.extend_from_slice(&0u64.to_be_bytes());
    pkt.extend_from_slice(&server_guid.to_be_bytes());
    pkt.extend_from_slice(&OFFLINE_MAGIC);
    pkt.extend_from_slice(&(status.len() as u16).to_be_bytes());
    pkt.extend_from_slice(status.as_bytes());
    pkt
}
