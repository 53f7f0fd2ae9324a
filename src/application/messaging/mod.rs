//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod middleware;
pub mod parser;

pub use dispatcher::EventDispatcher;
pub use middleware::{Middleware, MiddlewareChain};
pub use parser::{MessageParser, ParsedCommand};
