pub trait QueuePublisher {
    /// Publishes one message body and returns the queue's message id.
    fn publish(&self, queue_url: &str, body: &str) -> Result<String, String>;
}
