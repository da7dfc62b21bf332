//! Command parsing and canned replies.
//!
//! Each command maps 1:1 to a core call or a canned string; no core
//! behavior is reachable any other way.

/// A parsed incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/start` greeting.
    Start,
    /// `/hello` greeting.
    Hello,
    /// `/ping` liveness check.
    Ping,
    /// `/help` usage text.
    Help,
    /// `/translate <text>`.
    Translate(&'a str),
    /// `/ask_tool <question>`.
    AskTool(&'a str),
    /// A slash command the bot does not know.
    Unknown(&'a str),
    /// Plain text without a command.
    Text,
}

/// Parses message text into a command.
///
/// Accepts `@botname` suffixes on the command word so group-chat
/// invocations dispatch the same way.
#[must_use]
pub fn parse(text: &str) -> Command<'_> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return Command::Text;
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };
    let name = word
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or_default();

    match name {
        "start" => Command::Start,
        "hello" => Command::Hello,
        "ping" => Command::Ping,
        "help" => Command::Help,
        "translate" => Command::Translate(rest),
        "ask_tool" => Command::AskTool(rest),
        _ => Command::Unknown(name),
    }
}

/// `/start` reply.
#[must_use]
pub fn start_message(first_name: &str) -> String {
    format!("Welcome {first_name}! I help with translation and pentesting tool suggestions.")
}

/// `/hello` reply.
pub const HELLO_MESSAGE: &str = "Hi there!";

/// `/ping` reply.
pub const PING_MESSAGE: &str = "Pong!";

/// `/help` reply.
pub const HELP_MESSAGE: &str = "\
Hello! I am a pentesting assistant bot.\n\
Commands you can use:\n\n\
/start - Start over and get a welcome message.\n\
/hello - A friendly greeting.\n\
/ping - Check that the bot is alive.\n\
/translate <text> - Translate Vietnamese to English or fix English grammar.\n\
/ask_tool <question> - Get pentesting tool suggestions and example commands.\n\
/help - Show this guide.\n\n\
Type / and pick a command, or type it directly!";

/// Reply for `/translate` without text.
pub const TRANSLATE_USAGE: &str =
    "Please provide text to translate. Example: /translate xin chào thế giới";

/// Reply for `/ask_tool` without a question.
pub const ASK_TOOL_USAGE: &str =
    "Please provide a question. Example: /ask_tool how do I scan ports with nmap";

/// Reply for plain text and unknown commands.
pub const HINT_MESSAGE: &str = "\
I am a translation and pentesting suggestion bot. Please use:\n\
  /translate <your text> to translate.\n\
  /ask_tool <your question> to ask about security tools.\n\
  Or /help for more.";

/// Interim reply while a translation runs.
pub const TRANSLATING_MESSAGE: &str = "Translating, please wait...";

/// Interim reply while a lookup runs.
#[must_use]
pub fn searching_message(query: &str) -> String {
    format!("Looking for suggestions for: '{query}'...")
}

/// Last-resort reply when even plain-text delivery fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while sending the answer. Please try again.";
