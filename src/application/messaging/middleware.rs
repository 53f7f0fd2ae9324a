//! Middleware system for command guards

use std::sync::Arc;

use crate::domain::entities::{ChatMessage, Command, Guard, Session};

/// Context passed through middleware chain
#[derive(Debug, Clone)]
pub struct Context {
    pub command: String,
    pub args: String,
    pub sender_id: String,
    pub is_moderator: bool,
    pub is_admin: bool,
}

impl Context {
    pub fn new(command: impl Into<String>, args: impl Into<String>, message: &ChatMessage, session: &Session) -> Self {
        Self {
            command: command.into(),
            args: args.into(),
            sender_id: message.sender_id.clone(),
            is_moderator: session.is_moderator(&message.sender_id),
            is_admin: session.is_admin(&message.sender_id),
        }
    }
}

/// Middleware trait - processors that can short-circuit a command before its handler
pub trait Middleware: Send + Sync {
    /// Process a command and either pass it on or stop it
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult;
}

/// Result of middleware processing
pub type MiddlewareResult = Result<Context, MiddlewareError>;

/// Middleware errors
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareError {
    /// Stop processing, optionally replying to the sender
    Blocked(Option<String>),
    /// Internal error
    Internal(String),
}

impl std::fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareError::Blocked(Some(msg)) => write!(f, "Blocked: {}", msg),
            MiddlewareError::Blocked(None) => write!(f, "Blocked"),
            MiddlewareError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Next middleware in chain
#[derive(Clone)]
pub struct Next {
    remaining: Arc<Vec<Arc<dyn Middleware>>>,
}

impl Next {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            remaining: Arc::new(middlewares),
        }
    }

    /// Process remaining middleware
    pub fn run(self, ctx: Context) -> MiddlewareResult {
        if let Some(first) = self.remaining.first() {
            let remaining = self.remaining[1..].to_vec();
            let next = Next::new(remaining);
            first.process(ctx, next)
        } else {
            // No more middleware, the handler may run
            Ok(ctx)
        }
    }
}

/// Middleware chain builder
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Logging first, then the command's guards in declaration order
    pub fn for_command(command: &Command) -> Self {
        let mut chain = Self::new().add(LoggingMiddleware);
        for guard in &command.guards {
            chain = match guard {
                Guard::NoArgs => chain.add(NoArgsMiddleware),
                Guard::SingleArg => chain.add(SingleArgMiddleware::new(command.usage_hint())),
                Guard::Moderator => chain.add(ModeratorMiddleware { allow_admins: false }),
                Guard::AdminOrModerator => chain.add(ModeratorMiddleware { allow_admins: true }),
            };
        }
        chain
    }

    pub fn build(self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Silently drops commands that were given arguments
pub struct NoArgsMiddleware;

impl Middleware for NoArgsMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        if !ctx.args.is_empty() {
            return Err(MiddlewareError::Blocked(None));
        }
        next.run(ctx)
    }
}

/// Requires a non-blank argument
pub struct SingleArgMiddleware {
    usage: String,
}

impl SingleArgMiddleware {
    pub fn new(usage: impl Into<String>) -> Self {
        Self { usage: usage.into() }
    }
}

impl Middleware for SingleArgMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        if ctx.args.trim().is_empty() {
            return Err(MiddlewareError::Blocked(Some(self.usage.clone())));
        }
        next.run(ctx)
    }
}

/// Lets only moderators through (and admins, when allowed)
pub struct ModeratorMiddleware {
    pub allow_admins: bool,
}

impl Middleware for ModeratorMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let allowed = ctx.is_moderator || (self.allow_admins && ctx.is_admin);
        if !allowed {
            tracing::debug!("{} denied `{}`: not a moderator", ctx.sender_id, ctx.command);
            return Err(MiddlewareError::Blocked(None));
        }
        next.run(ctx)
    }
}

/// Logging middleware for debugging
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        tracing::debug!("[{}] {} {}", ctx.sender_id, ctx.command, ctx.args);

        let sender = ctx.sender_id.clone();
        let result = next.run(ctx);

        if let Err(e) = &result {
            tracing::debug!("[{}] {}", sender, e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(args: &str, is_moderator: bool, is_admin: bool) -> Context {
        Context {
            command: "/plload".to_string(),
            args: args.to_string(),
            sender_id: "u1".to_string(),
            is_moderator,
            is_admin,
        }
    }

    fn run(command: &Command, ctx: Context) -> MiddlewareResult {
        Next::new(MiddlewareChain::for_command(command).build()).run(ctx)
    }

    #[test]
    fn test_no_args_guard_is_silent() {
        let command = Command::new("/djup").with_guard(Guard::NoArgs);
        assert!(run(&command, ctx("", false, false)).is_ok());
        assert_eq!(
            run(&command, ctx("now", false, false)).unwrap_err(),
            MiddlewareError::Blocked(None)
        );
    }

    #[test]
    fn test_single_arg_guard_replies_with_usage() {
        let command = Command::new("/plswitch")
            .with_usage("/plswitch <playlist>")
            .with_guard(Guard::SingleArg);

        assert_eq!(
            run(&command, ctx("", false, false)).unwrap_err(),
            MiddlewareError::Blocked(Some("Usage: /plswitch <playlist>".to_string()))
        );
        assert!(run(&command, ctx("road trip", false, false)).is_ok());
    }

    #[test]
    fn test_moderator_guards() {
        let strict = Command::new("/reload").with_guard(Guard::Moderator);
        let relaxed = Command::new("/djup").with_guard(Guard::AdminOrModerator);

        assert!(run(&strict, ctx("", true, false)).is_ok());
        assert!(run(&strict, ctx("", false, true)).is_err());
        assert!(run(&relaxed, ctx("", false, true)).is_ok());
        assert!(run(&relaxed, ctx("", false, false)).is_err());
    }

    #[test]
    fn test_guards_run_in_declaration_order() {
        // Permission is checked before the argument, so outsiders get no usage hint.
        let command = Command::new("/plload")
            .with_guard(Guard::AdminOrModerator)
            .with_guard(Guard::SingleArg);

        assert_eq!(
            run(&command, ctx("", false, false)).unwrap_err(),
            MiddlewareError::Blocked(None)
        );
    }
}
