use crate::{
    error::Error,
    types::{self, Bucket, FieldValue, Timestamp},
};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::codec::{Decoder, Encoder};

/// An event line parsed back into its two buckets.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggedEvent {
    pub int: BTreeMap<String, FieldValue>,
    pub normal: BTreeMap<String, FieldValue>,
}

impl LoggedEvent {
    pub fn from_line(line: &str) -> Result<Self, Error> {
        serde_json::from_str(line).map_err(|e| Error::malformed_line(e.to_string()))
    }

    pub fn bucket(&self, bucket: Bucket) -> &BTreeMap<String, FieldValue> {
        match bucket {
            Bucket::Int => &self.int,
            Bucket::Normal => &self.normal,
        }
    }

    /// Sorted field names of the `int` bucket.
    pub fn int_keys(&self) -> Vec<&str> {
        self.int.keys().map(String::as_str).collect()
    }

    /// Sorted field names of the `normal` bucket.
    pub fn normal_keys(&self) -> Vec<&str> {
        self.normal.keys().map(String::as_str).collect()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.normal.get(types::TYPE).and_then(FieldValue::as_str)
    }

    pub fn session_id(&self) -> Option<i64> {
        self.int.get(types::SESSION_ID).and_then(FieldValue::as_int)
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.int.get(types::TIME).and_then(FieldValue::as_int)
    }
}

/// Newline delimited event lines.
///
/// Encodes already serialized lines and decodes lines into [`LoggedEvent`]s.
/// Blank lines are skipped when decoding.
#[derive(Copy, Clone, Debug, Default)]
pub struct EventLineCodec {
    // Offset already searched for a newline
    next_index: usize,
}

impl EventLineCodec {
    fn decode_line(line: &[u8]) -> Result<Option<LoggedEvent>, Error> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let s = std::str::from_utf8(line).map_err(|e| Error::malformed_line(e.to_string()))?;
        LoggedEvent::from_line(s).map(Some)
    }
}

impl Decoder for EventLineCodec {
    type Item = LoggedEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Loop until we've got a non-blank line or need more data
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');
            let Some(offset) = newline else {
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            if let Some(ev) = Self::decode_line(&line[..line.len() - 1])? {
                return Ok(Some(ev));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(ev) = self.decode(src)? {
            return Ok(Some(ev));
        }

        // Final line without a trailing newline
        let line = src.split();
        self.next_index = 0;
        Self::decode_line(&line)
    }
}

impl Encoder<String> for EventLineCodec {
    type Error = Error;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if line.contains('\n') {
            return Err(Error::malformed_line("event line contains a newline"));
        }
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const LINE: &str = r#"{"int":{"time":1700000000,"session_id":7,"number":10},"normal":{"str":"name","type":"test_event"}}"#;

    #[test]
    fn decode_split_lines() {
        let mut codec = EventLineCodec::default();
        let mut buf = BytesMut::from(&LINE.as_bytes()[..20]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&LINE.as_bytes()[20..]);
        buf.extend_from_slice(b"\n\n");
        let ev = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(ev.int_keys(), vec!["number", "session_id", "time"]);
        assert_eq!(ev.normal_keys(), vec!["str", "type"]);
        assert_eq!(ev.event_type(), Some("test_event"));
        assert_eq!(ev.session_id(), Some(7));
        assert_eq!(ev.time(), Some(1_700_000_000));

        // Trailing blank line
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_eof_without_newline() {
        let mut codec = EventLineCodec::default();
        let mut buf = BytesMut::from(LINE.as_bytes());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        let ev = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(ev.bucket(Bucket::Int).get("number"), Some(&FieldValue::Int(10)));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn malformed_lines() {
        let mut codec = EventLineCodec::default();
        for bad in [
            "not json\n",
            "{\"int\":{}}\n",
            "{\"int\":{},\"normal\":{},\"extra\":{}}\n",
            "{\"int\":{\"nested\":{}},\"normal\":{}}\n",
        ] {
            let mut buf = BytesMut::from(bad.as_bytes());
            let res = codec.decode(&mut buf);
            assert!(matches!(res, Err(Error::MalformedLine(_))), "{bad}");
        }
    }

    #[test]
    fn encode_terminates_and_rejects_newlines() {
        let mut codec = EventLineCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(LINE.to_owned(), &mut buf).unwrap();
        assert_eq!(&buf[..], format!("{LINE}\n").as_bytes());

        let res = codec.encode("{\n}".to_owned(), &mut buf);
        assert!(matches!(res, Err(Error::MalformedLine(_))));
    }
}
