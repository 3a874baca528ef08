//! Minimal RESP codec for the counter store wire protocol.
//!
//! Covers exactly the reply shapes the four commands we issue produce
//! (INCRBYFLOAT, EXPIRE, GET, PING): simple string, error, integer, and
//! bulk string including the nil bulk for absent keys.

use tally_shared::StoreError;

/// One decoded backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    /// Bulk string; `None` is the nil bulk (absent key).
    Bulk(Option<String>),
}

/// Encode a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 * (args.len() + 1));
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Try to decode one reply from a sticky buffer.
///
/// Returns `Ok(None)` until a full reply has arrived; consumed bytes are
/// drained from the buffer so the next reply can follow immediately.
pub fn try_decode(buffer: &mut Vec<u8>) -> Result<Option<Reply>, StoreError> {
    let Some(end) = find_crlf(buffer) else {
        return Ok(None);
    };
    if end == 0 {
        return Err(StoreError::Protocol("empty reply line".to_string()));
    }
    let kind = buffer[0];
    let line = std::str::from_utf8(&buffer[1..end])
        .map_err(|e| StoreError::Protocol(format!("non-utf8 reply line: {}", e)))?
        .to_string();

    match kind {
        b'+' => {
            buffer.drain(..end + 2);
            Ok(Some(Reply::Simple(line)))
        }
        b'-' => {
            buffer.drain(..end + 2);
            Ok(Some(Reply::Error(line)))
        }
        b':' => {
            let n = line
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad integer reply: {}", line)))?;
            buffer.drain(..end + 2);
            Ok(Some(Reply::Integer(n)))
        }
        b'$' => {
            let len: i64 = line
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad bulk length: {}", line)))?;
            if len < 0 {
                buffer.drain(..end + 2);
                return Ok(Some(Reply::Bulk(None)));
            }
            let body_start = end + 2;
            let len = len as usize;
            if buffer.len() < body_start + len + 2 {
                return Ok(None);
            }
            let body = std::str::from_utf8(&buffer[body_start..body_start + len])
                .map_err(|e| StoreError::Protocol(format!("non-utf8 bulk body: {}", e)))?
                .to_string();
            buffer.drain(..body_start + len + 2);
            Ok(Some(Reply::Bulk(Some(body))))
        }
        other => Err(StoreError::Protocol(format!(
            "unexpected reply type: {:?}",
            other as char
        ))),
    }
}
