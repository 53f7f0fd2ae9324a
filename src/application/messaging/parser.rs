//! Message parser - Splits chat text into a command token and its argument

/// A command token and its normalized argument string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: String,
}

/// Parses chat text into commands
#[derive(Debug, Default, Clone)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// First whitespace-separated token is the command, the rest is re-joined
    /// with single spaces. Blank text yields nothing.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let mut parts = text.split_whitespace();
        let name = parts.next()?.to_string();
        let args = parts.collect::<Vec<_>>().join(" ");
        Some(ParsedCommand { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_are_normalized() {
        let parsed = MessageParser::new().parse("  /plswitch   road \t trip  ").unwrap();
        assert_eq!(parsed.name, "/plswitch");
        assert_eq!(parsed.args, "road trip");
    }

    #[test]
    fn test_bare_command() {
        let parsed = MessageParser::new().parse("/djup").unwrap();
        assert_eq!(parsed.args, "");
    }

    #[test]
    fn test_blank_text() {
        assert_eq!(MessageParser::new().parse("   "), None);
    }
}
