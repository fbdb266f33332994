//! GameSpy4 (UT3) query: challenge handshake followed by a full-stat request.

use crate::{ProbeError, QueryResponse};

const MAGIC: [u8; 2] = [0xfe, 0xfd];
const HANDSHAKE: u8 = 0x09;
const STAT: u8 = 0x00;
const SPLITNUM: &[u8] = b"splitnum\x00\x80\x00";
const PLAYER_SECTION: &[u8] = b"\x01player_\x00\x00";

/// Session ids must have the high nibble of every byte cleared.
pub fn session_id(raw: u32) -> u32 {
    raw & 0x0f0f_0f0f
}

pub fn build_handshake(session: u32) -> Vec<u8> {
    let mut q = MAGIC.to_vec();
    q.push(HANDSHAKE);
    q.extend_from_slice(&session.to_be_bytes());
    q
}

/// Challenge token from a handshake reply: `09 <session> <ascii i32>\0`.
pub fn parse_challenge(data: &[u8]) -> Result<i32, ProbeError> {
    if data.len() < 6 || data[0] != HANDSHAKE {
        return Err(ProbeError::Malformed("not a handshake reply".into()));
    }
    let mut pos = 5;
    let token = read_cstr(data, &mut pos).ok_or_else(|| ProbeError::Malformed("missing challenge".into()))?;
    token.trim().parse::<i32>().map_err(|_| ProbeError::Malformed(format!("bad challenge: {}", token)))
}

pub fn build_full_stat(session: u32, challenge: i32) -> Vec<u8> {
    let mut q = MAGIC.to_vec();
    q.push(STAT);
    q.extend_from_slice(&session.to_be_bytes());
    q.extend_from_slice(&challenge.to_be_bytes());
    q.extend_from_slice(&[0, 0, 0, 0]);
    q
}

pub fn parse_full_stat(data: &[u8]) -> Result<QueryResponse, ProbeError> {
    if data.len() < 5 || data[0] != STAT {
        return Err(ProbeError::Malformed("not a stat reply".into()));
    }
    let mut pos = 5;
    if data[pos..].starts_with(SPLITNUM) {
        pos += SPLITNUM.len();
    }
    let mut out = QueryResponse::default();
    while let Some(key) = read_cstr(data, &mut pos) {
        if key.is_empty() {
            break;
        }
        let value = read_cstr(data, &mut pos).unwrap_or_default();
        match key.as_str() {
            "server_engine" => out.server_engine = Some(value),
            "plugins" => out.plugins = Some(value),
            _ => {}
        }
    }
    if data[pos.min(data.len())..].starts_with(PLAYER_SECTION) {
        pos += PLAYER_SECTION.len();
        let mut players = Vec::new();
        while let Some(name) = read_cstr(data, &mut pos) {
            if name.is_empty() {
                break;
            }
            players.push(name);
        }
        out.players = Some(players);
    }
    Ok(out)
}

/// Read a NUL-terminated string at `pos`, advancing past the terminator. A trailing
/// string without terminator is returned as-is; `None` once the buffer is exhausted.
fn read_cstr(data: &[u8], pos: &mut usize) -> Option<String> {
    let rest = data.get(*pos..).filter(|r| !r.is_empty())?;
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    *pos += (end + 1).min(rest.len());
    Some(String::from_utf8_lossy(&rest[..end]).into_owned())
}

#[cfg(test)]
pub(crate) fn encode_full_stat(fields: &[(&str, &str)], players: &[&str]) -> Vec<u8> {
    let mut r = vec![STAT, 0, 0, 0, 1];
    r.extend_from_slice(SPLITNUM);
    for (k, v) in fields {
        r.extend_from_slice(k.as_bytes());
        r.push(0);
        r.extend_from_slice(v.as_bytes());
        r.push(0);
    }
    r.push(0);
    r.extend_from_slice(PLAYER_SECTION);
    for p in players {
        r.extend_from_slice(p.as_bytes());
        r.push(0);
    }
    r.push(0);
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_and_challenge() {
        let s = session_id(0xffff_ffff);
        assert_eq!(s, 0x0f0f_0f0f);
        assert_eq!(build_handshake(s), vec![0xfe, 0xfd, 0x09, 0x0f, 0x0f, 0x0f, 0x0f]);
        let mut reply = vec![0x09, 0x0f, 0x0f, 0x0f, 0x0f];
        reply.extend_from_slice(b"-9513307\x00");
        assert_eq!(parse_challenge(&reply).unwrap(), -9_513_307);
        assert!(parse_challenge(b"\x09\x00\x00\x00\x00abc\x00").is_err());
    }

    #[test]
    fn full_stat_request_layout() {
        let q = build_full_stat(1, 9_513_307);
        assert_eq!(q.len(), 15);
        assert_eq!(&q[7..11], &9_513_307i32.to_be_bytes());
    }

    #[test]
    fn decodes_fields_and_players() {
        let data = encode_full_stat(
            &[("hostname", "Lobby"), ("server_engine", "PocketMine-MP 3.0"), ("plugins", "PocketMine-MP 3.0: Foo 1.0; Bar")],
            &["Steve", "Alex"],
        );
        let r = parse_full_stat(&data).unwrap();
        assert_eq!(r.server_engine.as_deref(), Some("PocketMine-MP 3.0"));
        assert_eq!(r.plugins.as_deref(), Some("PocketMine-MP 3.0: Foo 1.0; Bar"));
        assert_eq!(r.players, Some(vec!["Steve".to_string(), "Alex".to_string()]));
    }

    #[test]
    fn missing_sections_stay_none() {
        let r = parse_full_stat(&[STAT, 0, 0, 0, 1, b'k', 0, b'v', 0]).unwrap();
        assert_eq!(r, QueryResponse::default());
        assert!(parse_full_stat(&[0x09, 0, 0]).is_err());
    }
}
