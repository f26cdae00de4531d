//! Gateway: the webhook HTTP server.
//!
//! One port, three routes: a health greeting at `/`, the LINE webhook at
//! `POST /callback`, and 404 for everything else.

mod server;

pub use server::{run_gateway, GREETING};
