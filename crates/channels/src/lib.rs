//! Platform-neutral message routing: who gets an answer, and whether a
//! mention asks for an image or a chat reply.

pub mod routing;

pub use routing::{Inbound, Route, RoutingPolicy, should_respond, strip_mentions};
