use adalchemy_core::contract::Notification;

pub trait Notifier {
    fn send(&self, from: &str, notification: &Notification) -> Result<(), String>;
}
