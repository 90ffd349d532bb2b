//! Prompt text for persona agents.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever the template changes so
//! a logged reply can be traced back to the wording that produced it.

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.0.0";

/// Rendered into every persona prompt after the context.
pub const STYLE_INSTRUCTION: &str = "\
Generate a natural, brief response (1-2 sentences) that sounds human-like \
and stays in character.";

/// Build the discussion prompt for one agent.
pub fn persona_prompt(name: &str, persona: &str, context: &str) -> String {
    format!(
        "You are {name}.\n\
         Your personality: {persona}\n\
         \n\
         Current game context:\n\
         {context}\n\
         \n\
         {STYLE_INSTRUCTION}"
    )
}

/// Agent description shown to observers and logs.
pub fn agent_description(persona: &str) -> String {
    format!("Game AI player: {persona}")
}
