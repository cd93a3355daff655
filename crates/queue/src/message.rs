/// A message handed out by [`Queue::receive`](crate::Queue::receive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message id, stable across redeliveries.
    pub message_id: String,
    /// Raw message body.
    pub body: String,
    /// Token required to delete this delivery. Changes on every redelivery.
    pub receipt_handle: String,
    /// How many times the message has been delivered, including this one.
    pub receive_count: u32,
}
