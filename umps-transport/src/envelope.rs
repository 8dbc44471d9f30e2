//! Splits ROUTER/DEALER traffic into its routing-identity prefix and payload frames, using the
//! empty delimiter frame a ROUTER socket prepends to every inbound message (spec §4.4, §4.5).

use crate::socket::{Frame, Multipart};

/// One ROUTER/DEALER message, already split at the delimiter: `routing_id` is the chain of
/// identity frames a ROUTER socket stacks up as the message crosses proxy hops, `payload` is
/// whatever the application or a further proxy hop put after the delimiter.
#[derive(Debug, Eq, PartialEq)]
pub struct RoutedMessage {
    routing_id: Vec<Frame>,
    payload: Vec<Frame>,
}

impl RoutedMessage {
    pub fn new(routing_id: Vec<Frame>, payload: Vec<Frame>) -> Self {
        Self { routing_id, payload }
    }

    pub fn routing_id(&self) -> &[Frame] {
        &self.routing_id
    }

    pub fn payload(&self) -> &[Frame] {
        &self.payload
    }

    pub fn into_parts(self) -> (Vec<Frame>, Vec<Frame>) {
        (self.routing_id, self.payload)
    }
}

impl TryFrom<Multipart> for RoutedMessage {
    type Error = Multipart;

    /// The first empty frame is the delimiter; everything before it is routing identity,
    /// everything after is payload. Rejects frame sets with no delimiter at all.
    fn try_from(mut frames: Multipart) -> Result<Self, Self::Error> {
        let Some(delimiter) = frames.iter().position(|frame| frame.is_empty()) else {
            return Err(frames);
        };
        let payload = frames.split_off(delimiter + 1);
        frames.truncate(delimiter);
        Ok(Self { routing_id: frames, payload })
    }
}

impl From<RoutedMessage> for Multipart {
    fn from(message: RoutedMessage) -> Self {
        let RoutedMessage { mut routing_id, mut payload } = message;
        routing_id.push(Frame::new());
        routing_id.append(&mut payload);
        routing_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m<const N: usize>(frames: [&[u8]; N]) -> Multipart {
        frames.into_iter().map(Frame::from).collect()
    }

    #[test]
    fn splits_at_the_first_delimiter_and_rejoins() {
        let frames = m([b"hop2", b"hop1", b"", b"payload"]);
        let message = RoutedMessage::try_from(frames.clone()).unwrap();
        assert_eq!(message.routing_id(), &m([b"hop2", b"hop1"])[..]);
        assert_eq!(message.payload(), &m([b"payload"])[..]);
        assert_eq!(Multipart::from(message), frames);
    }

    #[test]
    fn empty_routing_id_round_trips() {
        let frames = m([b"", b"payload"]);
        let message = RoutedMessage::try_from(frames.clone()).unwrap();
        assert!(message.routing_id().is_empty());
        assert_eq!(Multipart::from(message), frames);
    }

    #[test]
    fn multi_frame_payload_round_trips() {
        let frames = m([b"id", b"", b"part1", b"part2"]);
        let message = RoutedMessage::try_from(frames.clone()).unwrap();
        assert_eq!(message.payload(), &m([b"part1", b"part2"])[..]);
        assert_eq!(Multipart::from(message), frames);
    }

    #[test]
    fn missing_delimiter_is_rejected() {
        let frames = m([b"id", b"payload"]);
        assert_eq!(RoutedMessage::try_from(frames.clone()), Err(frames));
    }
}
