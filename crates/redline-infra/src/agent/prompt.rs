//! System prompts for the three LLM-backed roles.
//!
//! The producer's reply format (`REASONING:` / `SCRIPT:`) is parsed by
//! [`parse_revision`]; keep the two in sync.

/// Marks the start of the producer's notes about its changes.
pub const REASONING_MARKER: &str = "REASONING:";
/// Marks the start of the deliverable draft.
pub const SCRIPT_MARKER: &str = "SCRIPT:";

pub const PRODUCER_PROMPT: &str = "\
You write short spoken scripts for news explainer videos.

When the request contains a link, call the fetch_article tool with that URL
before writing and base every factual statement on the returned article.
Use the script_length tool when you are unsure whether a draft fits the
length target.

Each script:
- opens with a hook in the first sentence,
- matches the tone the user asked for (neutral, critical, upbeat, ...),
- is between 700 and 1000 characters long,
- reads naturally out loud, with no stage directions or headings.

Feedback handling:
- Editor feedback is about style. Rewrite as much as needed to address it.
- Fact-check feedback lists factual errors. Fix exactly those statements and
  leave the rest of the script untouched.
- A new user message is a new instruction. Apply it to the latest script.

Reply in exactly this format:

REASONING:
<one or two sentences on what you wrote or changed and why>

SCRIPT:
<the full script>";

pub const REVIEWER_PROMPT: &str = "\
You are the editor for short news explainer scripts. Judge style only; a
separate fact-checker handles accuracy.

Check, in order of importance:
1. Tone: does the script match the tone the user asked for?
2. Hook: does the first sentence make a viewer keep watching?
3. Clarity: is it easy to follow when read aloud?
4. Length: is it between 700 and 1000 characters?
5. Structure: does it build to a clear ending?

Approve when the script is ready to record. Otherwise reject and give
concrete, actionable changes the writer can apply in one pass.

Respond with a JSON object: {\"approved\": bool, \"feedback\": string}.";

pub const VERIFIER_PROMPT: &str = "\
You fact-check short news explainer scripts against their source material.

Compare every factual claim in the latest script (names, numbers, dates,
quotes, causal statements) with the sources provided. Ignore tone, style,
and length entirely.

Approve when every claim is supported by the sources. Otherwise reject and
list each problem as: script says X, source says Y. Do not suggest any
other edits.

When no sources are provided, approve unless the script contradicts itself
or states something as fact that is plainly impossible.

Respond with a JSON object: {\"approved\": bool, \"feedback\": string}.";

/// Split a producer reply into `(draft, rationale)`.
///
/// A reply carrying both markers yields the text after `SCRIPT:` as the
/// draft and the text between the markers as the rationale. Anything else is
/// taken whole as the draft.
pub fn parse_revision(content: &str) -> (String, String) {
    let split = content
        .split_once(SCRIPT_MARKER)
        .and_then(|(head, draft)| head.split_once(REASONING_MARKER).map(|(_, r)| (draft, r)));
    match split {
        Some((draft, rationale)) => (draft.trim().to_string(), rationale.trim().to_string()),
        None => (content.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_revision_with_markers() {
        let reply = "REASONING:\nShortened the intro.\n\nSCRIPT:\n  The tide is turning.  ";
        let (draft, rationale) = parse_revision(reply);
        assert_eq!(draft, "The tide is turning.");
        assert_eq!(rationale, "Shortened the intro.");
    }

    #[test]
    fn test_parse_revision_without_markers() {
        let (draft, rationale) = parse_revision("  Just a script.\n");
        assert_eq!(draft, "Just a script.");
        assert!(rationale.is_empty());
    }

    #[test]
    fn test_parse_revision_needs_both_markers() {
        let (draft, rationale) = parse_revision("SCRIPT:\nonly the draft");
        assert_eq!(draft, "SCRIPT:\nonly the draft");
        assert!(rationale.is_empty());
    }

    #[test]
    fn test_prompts_name_the_reply_format() {
        assert!(PRODUCER_PROMPT.contains(REASONING_MARKER));
        assert!(PRODUCER_PROMPT.contains(SCRIPT_MARKER));
        assert!(REVIEWER_PROMPT.contains("\"approved\""));
        assert!(VERIFIER_PROMPT.contains("\"feedback\""));
    }
}
