//! desk-agent binary support: logging bootstrap, interactive REPL and the
//! HTTP/WebSocket server.

pub mod logging;
pub mod repl;
pub mod server;
