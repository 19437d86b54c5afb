//! Session hook.

use aether_core::RequestContext;

/// Option that asks for a session to be started before rendering.
pub const SESSION_OPTION: &str = "session";

/// Starts a user session for requests whose options ask for one.
pub trait SessionHandler: Send + Sync {
    fn start(&self, request: &RequestContext);
}
