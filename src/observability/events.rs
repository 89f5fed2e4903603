//! Observable events for PetPort
//!
//! Every log line the service writes names one of these events.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Process
    /// Service starting
    BootStart,
    /// HTTP server bound and serving
    Serving,
    /// Shutdown requested
    ShutdownStart,
    /// Configuration loaded and validated
    ConfigLoaded,

    // Subscription lifecycle
    /// Subscriber moved from active to grace
    GraceStarted,
    /// Subscriber moved from grace to suspended
    SubscriberSuspended,
    /// Conditional update lost to a concurrent writer
    TransitionSkipped,
    /// Grace period notification handed to the dispatcher
    GraceNoticeSent,
    /// Grace period event kind was not recognized
    UnknownEventKind,

    // Corruption detection
    /// Scan found no corrupted subscribers
    CorruptionScanHealthy,
    /// Scan found subscribers without a billing reference
    CorruptionDetected,

    // Notification dispatch
    /// Dispatcher delivered a notification
    NotificationDispatched,
    /// Dispatcher failed to deliver
    DispatchFailed,
    /// Notification written to the log instead of delivered
    NotificationLogged,

    // Scheduler
    /// Job registered with the scheduler
    JobScheduled,
    /// Job run failed; next run follows the cron schedule
    JobFailed,

    // Gesture arbitration
    /// Gesture session aborted by a second pointer
    GestureMultiTouchAbort,
    /// Navigation intent suppressed at commit time
    NavigationSuppressed,
    /// Pull-to-refresh started
    RefreshStarted,
    /// Pull-to-refresh operation failed
    RefreshFailed,
    /// Refresh settled after the view was unmounted
    RefreshDiscarded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "PETPORT_STARTUP_BEGIN",
            Event::Serving => "PETPORT_SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::GraceStarted => "GRACE_STARTED",
            Event::SubscriberSuspended => "SUBSCRIBER_SUSPENDED",
            Event::TransitionSkipped => "TRANSITION_SKIPPED",
            Event::GraceNoticeSent => "GRACE_NOTICE_SENT",
            Event::UnknownEventKind => "UNKNOWN_EVENT_KIND",

            Event::CorruptionScanHealthy => "CORRUPTION_SCAN_HEALTHY",
            Event::CorruptionDetected => "CORRUPTION_DETECTED",

            Event::NotificationDispatched => "NOTIFICATION_DISPATCHED",
            Event::DispatchFailed => "DISPATCH_FAILED",
            Event::NotificationLogged => "NOTIFICATION_LOGGED",

            Event::JobScheduled => "JOB_SCHEDULED",
            Event::JobFailed => "JOB_FAILED",

            Event::GestureMultiTouchAbort => "GESTURE_MULTI_TOUCH_ABORT",
            Event::NavigationSuppressed => "NAVIGATION_SUPPRESSED",
            Event::RefreshStarted => "REFRESH_STARTED",
            Event::RefreshFailed => "REFRESH_FAILED",
            Event::RefreshDiscarded => "REFRESH_DISCARDED",
        }
    }

    /// Events that operators must be paged for
    pub fn is_alert(&self) -> bool {
        matches!(self, Event::CorruptionDetected | Event::DispatchFailed | Event::JobFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
