use crate::audio::track::NowPlaying;
use std::time::Duration;

#[cfg(feature = "notify")]
pub use self::desktop::DesktopNotifier;

pub const NOTIFICATION_SUMMARY: &str = "Now Playing";
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

/// Raised when the user interacts with a delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierEvent {
    FocusRequested,
}

/// Outbound "now playing" signal. Delivery is fire-and-forget: failures are
/// logged by the implementation and never reach the caller.
pub trait NowPlayingNotifier {
    fn announce(&self, now_playing: &NowPlaying);
}

/// Used when notifications are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl NowPlayingNotifier for SilentNotifier {
    fn announce(&self, _now_playing: &NowPlaying) {}
}

#[cfg(feature = "notify")]
mod desktop {
    use super::{NotifierEvent, NowPlayingNotifier, NOTIFICATION_SUMMARY};
    use crate::audio::track::NowPlaying;
    use notify_rust::{Notification, Timeout};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tracing::{debug, warn};

    /// OS notification through `notify-rust`, shown from the blocking pool so
    /// a slow notification daemon never stalls the frame loop.
    #[derive(Debug, Clone)]
    pub struct DesktopNotifier {
        duration: Duration,
        events: Option<mpsc::UnboundedSender<NotifierEvent>>,
    }

    impl DesktopNotifier {
        pub fn new(duration: Duration) -> Self {
            Self { duration, events: None }
        }

        pub fn with_event_sender(mut self, sender: mpsc::UnboundedSender<NotifierEvent>) -> Self {
            self.events = Some(sender);
            self
        }

        fn build(&self, now_playing: &NowPlaying) -> Notification {
            let mut notification = Notification::new();
            notification
                .appname("tunedeck")
                .summary(NOTIFICATION_SUMMARY)
                .body(&now_playing.notification_body())
                .timeout(Timeout::Milliseconds(self.duration.as_millis().min(u128::from(u32::MAX)) as u32));
            #[cfg(all(unix, not(target_os = "macos")))]
            notification.action("default", "Focus");
            notification
        }
    }

    impl NowPlayingNotifier for DesktopNotifier {
        fn announce(&self, now_playing: &NowPlaying) {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("No runtime available, notification for {} dropped", now_playing.title);
                return;
            };

            let notification = self.build(now_playing);
            let events = self.events.clone();
            runtime.spawn_blocking(move || match notification.show() {
                #[cfg(all(unix, not(target_os = "macos")))]
                Ok(handle) => handle.wait_for_action(|action| {
                    if action == "default" {
                        debug!("Notification clicked");
                        if let Some(events) = &events {
                            let _ = events.send(NotifierEvent::FocusRequested);
                        }
                    }
                }),
                #[cfg(not(all(unix, not(target_os = "macos"))))]
                Ok(_) => {
                    let _ = events;
                }
                Err(e) => warn!("Error showing notification: {}", e),
            });
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::notify::DEFAULT_NOTIFICATION_DURATION;
        use std::path::Path;

        #[test]
        fn notification_carries_summary_body_and_timeout() {
            let notifier = DesktopNotifier::new(DEFAULT_NOTIFICATION_DURATION);
            let notification = notifier.build(&NowPlaying::degraded(0, Path::new("/m/Daft Punk - One More Time.mp3")));

            assert_eq!(notification.summary, "Now Playing");
            assert_eq!(notification.body, "One More Time by Daft Punk");
            assert!(matches!(notification.timeout, Timeout::Milliseconds(5000)));
        }

        #[test]
        fn configured_duration_reaches_the_timeout() {
            let notifier = DesktopNotifier::new(Duration::from_millis(1500));
            let notification = notifier.build(&NowPlaying::degraded(0, Path::new("/m/Solo.mp3")));
            assert!(matches!(notification.timeout, Timeout::Milliseconds(1500)));
            assert_eq!(notification.body, "Solo by Unknown Artist");
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        #[test]
        fn focus_action_is_registered() {
            let notification = DesktopNotifier::new(DEFAULT_NOTIFICATION_DURATION)
                .build(&NowPlaying::degraded(0, Path::new("/m/Solo.mp3")));
            assert!(notification.actions.iter().any(|action| action == "default"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_duration_is_five_seconds() {
        assert_eq!(DEFAULT_NOTIFICATION_DURATION.as_secs(), 5);
    }
}
