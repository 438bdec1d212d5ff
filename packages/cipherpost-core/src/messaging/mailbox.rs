//! Single-slot holder for the most recently encoded, not yet sent message.

use parking_lot::Mutex;

use super::message::EncryptedMessage;

/// Holds zero or one [`EncryptedMessage`]
///
/// Empty at startup, filled by a successful encode, emptied once the send
/// path consumes it. A newer encode overwrites an unconsumed message.
#[derive(Debug, Default)]
pub struct MessageMailbox {
    slot: Mutex<Option<EncryptedMessage>>,
}

impl MessageMailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a message, returning the one it replaced
    pub fn put(&self, message: EncryptedMessage) -> Option<EncryptedMessage> {
        let replaced = self.slot.lock().replace(message);
        if replaced.is_some() {
            tracing::debug!("Mailbox message replaced before it was sent");
        }
        replaced
    }

    /// Read the current message without consuming it
    pub fn peek(&self) -> Option<EncryptedMessage> {
        self.slot.lock().clone()
    }

    /// Consume the current message
    pub fn take(&self) -> Option<EncryptedMessage> {
        self.slot.lock().take()
    }

    /// Drop the current message, if any
    pub fn clear(&self) {
        self.slot.lock().take();
    }

    /// Whether nothing is waiting to be sent
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(byte: u8) -> EncryptedMessage {
        EncryptedMessage::new(vec![byte; 4], vec![byte; 2])
    }

    #[test]
    fn test_lifecycle() {
        let mailbox = MessageMailbox::new();
        assert!(mailbox.is_empty());

        assert!(mailbox.put(message(1)).is_none());
        assert_eq!(mailbox.peek(), Some(message(1)));
        assert!(!mailbox.is_empty());

        assert_eq!(mailbox.take(), Some(message(1)));
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let mailbox = MessageMailbox::new();

        mailbox.put(message(1));
        assert_eq!(mailbox.put(message(2)), Some(message(1)));
        assert_eq!(mailbox.take(), Some(message(2)));
    }

    #[test]
    fn test_clear() {
        let mailbox = MessageMailbox::new();
        mailbox.put(message(1));
        mailbox.clear();
        assert!(mailbox.is_empty());
    }
}
