//! Line encoder for writing events in wire form

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::event::Event;
use crate::DELIMITER;

/// Writes each [`Event`] as one JSON object followed by `\n`
///
/// Used by anything that publishes events in the daemon's format, such as
/// test peers and replay tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEncoder;

impl LineEncoder {
    pub fn new() -> Self {
        Self
    }
}

/// Encode one event as a complete wire line, delimiter included
pub fn encode_line(event: &Event) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(event)?;
    line.push(DELIMITER);
    Ok(line)
}

impl Encoder<&Event> for LineEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: &Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = encode_line(item)?;
        dst.extend_from_slice(&line);
        Ok(())
    }
}

impl Encoder<Event> for LineEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&Event>>::encode(self, &item, dst)
    }
}
