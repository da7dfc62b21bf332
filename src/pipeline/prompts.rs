//! Prompt templates and fixed strings for the answer pipeline.

/// Exact marker the grounded phase emits when the retrieved context
/// cannot answer the question. Compared by exact string equality after
/// trimming; never fuzzy-matched.
pub const NO_CONTEXT_SENTINEL: &str = "[NO_CONTEXT_DATA_FOUND]";

/// Appended to every general-knowledge answer.
pub const KNOWLEDGE_DISCLAIMER: &str = "<i>This answer comes from the model's general knowledge \
and was not verified against the tool documentation index.</i>";

/// Returned when the RAG feature is disabled or failed to initialize.
pub const FEATURE_UNAVAILABLE_MESSAGE: &str = "The tool suggestion feature is currently \
unavailable. Please check the bot configuration or notify the admin.";

/// Markup rules shared by both phases.
const FORMAT_RULES: &str = "\
Format the answer for a chat client that accepts ONLY this HTML tag set: \
<b>, <i>, <u>, <s>, <tg-spoiler>, <a href=\"...\">, <code>, <pre>. \
Put shell commands and configuration in <pre> blocks and inline flags in <code>. \
Use <b> and <i> sparingly, only for genuinely important terms. \
Never use <p>, <br>, <ul>, <li>, headings, or markdown syntax.";

/// System instruction for the grounded phase.
pub fn grounded_system_prompt() -> String {
    format!(
        "You are a helpful penetration-testing expert. Answer the user's question \
USING ONLY the tool documentation supplied in the context. Suggest the matching \
tools and give concrete example commands taken from the context.\n\
If the context is insufficient or not relevant to the question, respond with \
exactly {NO_CONTEXT_SENTINEL} and nothing else.\n\n{FORMAT_RULES}"
    )
}

/// System instruction for the general-knowledge phase.
pub fn open_system_prompt() -> String {
    format!(
        "You are a helpful penetration-testing expert. The documentation index had \
no relevant material, so answer from your own knowledge of security tooling. Give \
practical, realistic suggestions with example commands.\n\n{FORMAT_RULES}"
    )
}

/// User message for the grounded phase.
pub fn grounded_user_prompt(context: &str, question: &str) -> String {
    format!("Tool documentation context:\n{context}\n\nUser question: {question}")
}

/// User message for the general-knowledge phase.
pub fn open_user_prompt(question: &str) -> String {
    format!("User question: {question}")
}
