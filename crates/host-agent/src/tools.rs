//! Discussion tools private to persona agents.
//!
//! The scheduler never sees these; they shape what a scripted agent says.

use serde::Serialize;

/// Words that make a statement sound unsure.
const HEDGES: &[&str] = &[
    "maybe", "probably", "i think", "i guess", "not sure", "kind of", "sort of", "perhaps",
];

/// Result of looking over a human statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementAnalysis {
    pub word_count: usize,
    pub is_question: bool,
    pub hedges: usize,
    pub exclamations: usize,
}

impl StatementAnalysis {
    /// Short free-text summary, for logs.
    pub fn summary(&self) -> String {
        let tone = match (self.is_question, self.hedges) {
            (true, _) => "inquisitive",
            (false, 0) if self.exclamations > 0 => "emphatic",
            (false, 0) => "assertive",
            (false, _) => "hesitant",
        };
        format!("{} words, {tone}", self.word_count)
    }
}

/// Tools bound to one round of discussion.
#[derive(Debug, Clone)]
pub struct DiscussionTools {
    round: u32,
}

impl DiscussionTools {
    pub fn new(round: u32) -> Self {
        Self { round }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Look at a statement for the cues a suspicious player would notice.
    pub fn analyze_human_statement(&self, text: &str) -> StatementAnalysis {
        let lower = text.to_lowercase();
        StatementAnalysis {
            word_count: text.split_whitespace().count(),
            is_question: text.trim_end().ends_with('?'),
            hedges: HEDGES.iter().filter(|h| lower.contains(*h)).count(),
            exclamations: text.matches('!').count(),
        }
    }

    pub fn propose_elimination(&self, player_id: &str, reason: &str) -> String {
        format!("Propose eliminating {player_id} because: {reason}")
    }

    pub fn request_clarification(&self, player_id: &str, question: &str) -> String {
        format!("Question to {player_id}: {question}")
    }
}

/// Pull the quoted human text back out of a discussion context.
///
/// Contexts look like `Human said in round 2: "text"`; anything else is
/// returned whole.
pub fn quoted_text(context: &str) -> &str {
    match (context.find('"'), context.rfind('"')) {
        (Some(start), Some(end)) if end > start => &context[start + 1..end],
        _ => context,
    }
}

/// Round number from a discussion context, if present.
pub fn context_round(context: &str) -> Option<u32> {
    let rest = context.split("round ").nth(1)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_question() {
        let tools = DiscussionTools::new(1);
        let analysis = tools.analyze_human_statement("Who was awake at 3am?");
        assert!(analysis.is_question);
        assert_eq!(analysis.word_count, 5);
        assert_eq!(analysis.summary(), "5 words, inquisitive");
    }

    #[test]
    fn test_analyze_hedging() {
        let tools = DiscussionTools::new(1);
        let analysis = tools.analyze_human_statement("I think maybe it was Bo, not sure");
        assert!(!analysis.is_question);
        assert_eq!(analysis.hedges, 3);
        assert!(analysis.summary().ends_with("hesitant"));
    }

    #[test]
    fn test_analyze_emphatic() {
        let tools = DiscussionTools::new(2);
        let analysis = tools.analyze_human_statement("It was definitely Cy!");
        assert_eq!(analysis.exclamations, 1);
        assert!(analysis.summary().ends_with("emphatic"));
    }

    #[test]
    fn test_proposal_and_question_wording() {
        let tools = DiscussionTools::new(1);
        assert_eq!(
            tools.propose_elimination("ai-2", "too polished"),
            "Propose eliminating ai-2 because: too polished"
        );
        assert_eq!(
            tools.request_clarification("u-1", "where were you?"),
            "Question to u-1: where were you?"
        );
    }

    #[test]
    fn test_context_parsing() {
        let context = "Human said in round 12: \"I \"really\" mean it\"";
        assert_eq!(quoted_text(context), "I \"really\" mean it");
        assert_eq!(context_round(context), Some(12));
        assert_eq!(quoted_text("no quotes"), "no quotes");
        assert_eq!(context_round("no round here"), None);
    }
}
