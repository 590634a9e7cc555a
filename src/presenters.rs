/// a transient user-facing notice (a toast). controllers convert every
/// recoverable failure into one of these instead of propagating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn text(&self) -> &str {
        match self {
            Notification::Success(s) | Notification::Error(s) => s,
        }
    }
}

/// notification sink supplied by the UI layer.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// clipboard-equivalent sink for `copy_content`. best effort only.
pub trait Clipboard {
    fn write_text(&self, text: &str);
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::{Clipboard, Notification, Notifier};

    #[derive(Default)]
    pub struct RecordingNotifier(Mutex<Vec<Notification>>);

    impl RecordingNotifier {
        pub fn taken(&self) -> Vec<Notification> {
            self.0.lock().unwrap().drain(..).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    #[derive(Default)]
    pub struct RecordingClipboard(Mutex<Option<String>>);

    impl RecordingClipboard {
        pub fn contents(&self) -> Option<String> { self.0.lock().unwrap().clone() }
    }

    impl Clipboard for RecordingClipboard {
        fn write_text(&self, text: &str) {
            *self.0.lock().unwrap() = Some(text.to_string());
        }
    }
}
