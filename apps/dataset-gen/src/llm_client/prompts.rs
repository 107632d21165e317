// Shared prompt fragments.
// Each stage that calls the LLM keeps its own prompts.rs alongside it;
// this file holds the cross-cutting pieces.

/// Appended to any request whose reply must be machine-parsed as a JSON array.
pub const JSON_ARRAY_ONLY: &str = "\
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
