//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Command table and room requests
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing, guard middleware, event dispatching

pub mod errors;
pub mod services;
pub mod messaging;
