//! Messaging link tracking
//!
//! Hand positions are not persisted anywhere, so after every (re)connection
//! the clock asks all location sources to resend. Exactly one announce is
//! produced per connection, however many `Connected` notifications arrive.

use weasley_protocol::AnnounceRequest;

use crate::state::LinkEvent;

/// Tracks link state and decides when to announce
#[derive(Debug, Clone, Default)]
pub struct LinkMonitor {
    connected: bool,
    connections: u32,
}

impl LinkMonitor {
    /// Create a monitor in the disconnected state
    pub const fn new() -> Self {
        Self {
            connected: false,
            connections: 0,
        }
    }

    /// Handle a link transition, returning the announce to send, if any
    pub fn on_event(&mut self, event: LinkEvent) -> Option<AnnounceRequest> {
        match event {
            LinkEvent::Connected if !self.connected => {
                self.connected = true;
                self.connections = self.connections.saturating_add(1);
                info!("link up (connection {}), announcing", self.connections);
                Some(AnnounceRequest)
            }
            LinkEvent::Connected => {
                trace!("duplicate connect ignored");
                None
            }
            LinkEvent::Disconnected => {
                if self.connected {
                    warn!("link down");
                }
                self.connected = false;
                None
            }
        }
    }

    /// Returns true while the link is up
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of successful connections so far
    pub fn connections(&self) -> u32 {
        self.connections
    }
}
