use tokio::sync::mpsc;

/// A full-page navigation the UI shell must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub route: String,
    pub reason: NavigationReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationReason {
    SessionExpired,
    LoggedOut,
}

/// Where the client sends users once their session is gone.
pub trait Navigator: Send + Sync {
    fn navigate(&self, request: NavigationRequest);
}

/// Forwards navigation requests to the UI shell over a channel.
#[derive(Debug, Clone)]
pub struct NavigationBus {
    tx: mpsc::UnboundedSender<NavigationRequest>,
}

impl NavigationBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavigationRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for NavigationBus {
    fn navigate(&self, request: NavigationRequest) {
        if self.tx.send(request).is_err() {
            tracing::warn!("navigation receiver dropped; redirect not delivered");
        }
    }
}

/// Only records the redirect in the log. For headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, request: NavigationRequest) {
        tracing::info!(route = %request.route, reason = ?request.reason, "navigation requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_requests_in_order() {
        let (bus, mut rx) = NavigationBus::new();
        bus.navigate(NavigationRequest {
            route: "/".to_string(),
            reason: NavigationReason::SessionExpired,
        });
        bus.navigate(NavigationRequest {
            route: "/login".to_string(),
            reason: NavigationReason::LoggedOut,
        });

        assert_eq!(rx.try_recv().unwrap().reason, NavigationReason::SessionExpired);
        assert_eq!(rx.try_recv().unwrap().route, "/login");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn bus_survives_dropped_receiver() {
        let (bus, rx) = NavigationBus::new();
        drop(rx);
        bus.navigate(NavigationRequest {
            route: "/".to_string(),
            reason: NavigationReason::LoggedOut,
        });
    }
}
