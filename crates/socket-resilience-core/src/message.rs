//! Messages carried by a transport.

/// Classification of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Application payload.
    Data,
    /// Keep-alive probe.
    Ping,
    /// Keep-alive reply.
    Pong,
    /// Close notification from the peer.
    Close,
}

impl MessageKind {
    /// Returns `true` for application payloads.
    pub fn is_data(self) -> bool {
        matches!(self, MessageKind::Data)
    }

    /// Returns `true` for ping, pong and close frames.
    pub fn is_control(self) -> bool {
        !self.is_data()
    }
}

/// An opaque payload tagged with its [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a message of the given kind.
    pub fn new(kind: MessageKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Creates a data message.
    pub fn data(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageKind::Data, payload)
    }

    /// The ping written by the active heartbeat.
    pub fn ping() -> Self {
        Self::new(MessageKind::Ping, Vec::new())
    }

    /// Creates a pong echoing `payload`.
    pub fn pong(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(MessageKind::Pong, payload)
    }

    /// Creates a close frame.
    pub fn close() -> Self {
        Self::new(MessageKind::Close, Vec::new())
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
