use tokio::sync::mpsc;

use crate::error::ServiceError;
use crate::models::SessionState;

/// Something the playback pipeline reports as it happens
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The unit now sounding, or None when nothing is
    SoundingChanged(Option<u32>),
    PlayingChanged(bool),
    LoadingChanged(bool),
    StateChanged(SessionState),
    /// Every generated unit of the chapter has been played
    ChapterFinished,
    /// A session was aborted by a service failure. Sent once per session.
    Failed(ServiceError),
}

/// Receives pipeline events. Implementations must not block.
pub trait PlaybackObserver: Send + Sync {
    fn notify(&self, event: PlaybackEvent);
}

/// Forwards events into a tokio channel
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl PlaybackObserver for ChannelObserver {
    fn notify(&self, event: PlaybackEvent) {
        // Receiver gone means nobody is listening anymore
        let _ = self.sender.send(event);
    }
}

/// Keeps every event in memory
#[cfg(test)]
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<PlaybackEvent>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<ServiceError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::Failed(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    /// Units in the order they started sounding
    pub fn sounded_units(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::SoundingChanged(unit) => unit,
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl PlaybackObserver for RecordingObserver {
    fn notify(&self, event: PlaybackEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_forwards_in_order() {
        let (observer, mut receiver) = ChannelObserver::new();
        observer.notify(PlaybackEvent::LoadingChanged(true));
        observer.notify(PlaybackEvent::SoundingChanged(Some(1)));

        assert_eq!(receiver.recv().await, Some(PlaybackEvent::LoadingChanged(true)));
        assert_eq!(receiver.recv().await, Some(PlaybackEvent::SoundingChanged(Some(1))));
    }

    #[test]
    fn test_channel_observer_ignores_closed_receiver() {
        let (observer, receiver) = ChannelObserver::new();
        drop(receiver);
        observer.notify(PlaybackEvent::ChapterFinished);
    }

    #[test]
    fn test_recording_observer_helpers() {
        let observer = RecordingObserver::new();
        observer.notify(PlaybackEvent::SoundingChanged(Some(2)));
        observer.notify(PlaybackEvent::SoundingChanged(None));
        observer.notify(PlaybackEvent::SoundingChanged(Some(3)));
        observer.notify(PlaybackEvent::Failed(ServiceError::AuthOrQuota("401".to_string())));

        assert_eq!(observer.sounded_units(), vec![2, 3]);
        assert_eq!(observer.failures().len(), 1);
        assert_eq!(observer.events().len(), 4);
    }
}
