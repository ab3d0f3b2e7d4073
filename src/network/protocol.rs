//! Redis RESP2 protocol codec

use crate::error::{Result, TtlKvError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// RESP value types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string (`$-1`); null arrays decode to it too
    BulkString(Option<String>),
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn bulk(s: impl Into<String>) -> Self {
        RespValue::BulkString(Some(s.into()))
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }
}

/// Redis RESP protocol codec
#[derive(Debug, Default, Clone, Copy)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a command as an array of bulk strings
    pub fn encode_command<S: AsRef<str>>(&self, parts: &[S]) -> BytesMut {
        let mut dst = BytesMut::with_capacity(16 + parts.iter().map(|p| p.as_ref().len() + 16).sum::<usize>());
        dst.put_slice(format!("*{}\r\n", parts.len()).as_bytes());
        for part in parts {
            let part = part.as_ref();
            dst.put_slice(format!("${}\r\n", part.len()).as_bytes());
            dst.put_slice(part.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst
    }

    /// Encode any RESP value
    pub fn encode(&self, value: &RespValue, dst: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => {
                dst.put_u8(b'+');
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            RespValue::Error(msg) => {
                dst.put_u8(b'-');
                dst.put_slice(msg.as_bytes());
                dst.put_slice(b"\r\n");
            }
            RespValue::Integer(i) => {
                dst.put_slice(format!(":{i}\r\n").as_bytes());
            }
            RespValue::BulkString(None) => dst.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(s)) => {
                dst.put_slice(format!("${}\r\n", s.len()).as_bytes());
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            RespValue::Array(items) => {
                dst.put_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    self.encode(item, dst);
                }
            }
        }
    }

    /// Decode one frame from the front of `src`.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched when the frame is not
    /// complete yet; otherwise the frame's bytes are consumed.
    pub fn decode(&self, src: &mut BytesMut) -> Result<Option<RespValue>> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&src[..]);
        match parse_value(&mut cursor)? {
            Some(value) => {
                let consumed = cursor.position() as usize;
                src.advance(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

fn parse_value(cursor: &mut Cursor<&[u8]>) -> Result<Option<RespValue>> {
    if !cursor.has_remaining() {
        return Ok(None);
    }

    match cursor.get_u8() {
        b'+' => Ok(read_line(cursor)?.map(RespValue::SimpleString)),
        b'-' => Ok(read_line(cursor)?.map(RespValue::Error)),
        b':' => match read_line(cursor)? {
            Some(line) => line
                .parse::<i64>()
                .map(|i| Some(RespValue::Integer(i)))
                .map_err(|_| TtlKvError::protocol(format!("Invalid integer: {line}"))),
            None => Ok(None),
        },
        b'$' => parse_bulk_string(cursor),
        b'*' => parse_array(cursor),
        other => Err(TtlKvError::protocol(format!(
            "Unknown RESP type: {}",
            other as char
        ))),
    }
}

/// `$5\r\nhello\r\n`, or `$-1\r\n` for null
fn parse_bulk_string(cursor: &mut Cursor<&[u8]>) -> Result<Option<RespValue>> {
    let Some(length) = read_length(cursor, "bulk string")? else {
        return Ok(None);
    };
    let Some(length) = length else {
        return Ok(Some(RespValue::BulkString(None)));
    };

    if cursor.remaining() < length + 2 {
        return Ok(None);
    }

    let start = cursor.position() as usize;
    let data = &cursor.get_ref()[start..start + length];
    let terminator = &cursor.get_ref()[start + length..start + length + 2];
    if terminator != b"\r\n" {
        return Err(TtlKvError::protocol(
            "Missing \\r\\n terminator for bulk string",
        ));
    }

    let string = String::from_utf8(data.to_vec())
        .map_err(|_| TtlKvError::protocol("Invalid UTF-8 in bulk string"))?;
    cursor.advance(length + 2);

    Ok(Some(RespValue::BulkString(Some(string))))
}

/// `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
fn parse_array(cursor: &mut Cursor<&[u8]>) -> Result<Option<RespValue>> {
    let Some(length) = read_length(cursor, "array")? else {
        return Ok(None);
    };
    let Some(length) = length else {
        return Ok(Some(RespValue::BulkString(None)));
    };

    let mut elements = Vec::with_capacity(length.min(1024));
    for _ in 0..length {
        match parse_value(cursor)? {
            Some(element) => elements.push(element),
            None => return Ok(None),
        }
    }

    Ok(Some(RespValue::Array(elements)))
}

/// Length header; `Some(None)` for the `-1` null marker
fn read_length(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<Option<Option<usize>>> {
    let Some(line) = read_line(cursor)? else {
        return Ok(None);
    };

    let length = line
        .parse::<i64>()
        .map_err(|_| TtlKvError::protocol(format!("Invalid {what} length: {line}")))?;

    match length {
        -1 => Ok(Some(None)),
        n if n < 0 => Err(TtlKvError::protocol(format!(
            "Invalid {what} length: {n}"
        ))),
        n => Ok(Some(Some(n as usize))),
    }
}

/// Read a line terminated by \r\n
fn read_line(cursor: &mut Cursor<&[u8]>) -> Result<Option<String>> {
    let start = cursor.position() as usize;
    let data = *cursor.get_ref();

    let Some(offset) = data[start..].windows(2).position(|w| w == b"\r\n") else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[start..start + offset])
        .map_err(|_| TtlKvError::protocol("Invalid UTF-8 in line"))?
        .to_string();
    cursor.set_position((start + offset + 2) as u64);

    Ok(Some(line))
}
