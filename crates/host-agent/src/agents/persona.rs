//! Scripted persona agent.
//!
//! Stands in for a model-backed player: renders the persona prompt, reads the
//! human statement with the discussion tools, waits a configured latency and
//! answers from a small set of templates. Failures can be injected on a fixed
//! cadence to exercise the fallback path.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coordination::{AgentError, AgentProfile, Responder};
use tracing::debug;

use crate::prompts::{persona_prompt, PROMPT_VERSION};
use crate::tools::{context_round, quoted_text, DiscussionTools};

const OPENERS: &[&str] = &["Honestly,", "Hmm,", "Okay so", "Not gonna lie,", "Wait,"];

/// A `Responder` that answers in character without an inference backend.
#[derive(Debug)]
pub struct ScriptedAgent {
    profile: AgentProfile,
    latency: Duration,
    fail_every: u32,
    calls: AtomicU32,
}

impl ScriptedAgent {
    pub fn new(profile: AgentProfile) -> Self {
        Self {
            profile,
            latency: Duration::ZERO,
            fail_every: 0,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`th call; 0 disables failures.
    pub fn failing_every(mut self, n: u32) -> Self {
        self.fail_every = n;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn compose(&self, context: &str, call: u32) -> String {
        let round = context_round(context).unwrap_or(0);
        let tools = DiscussionTools::new(round);
        let statement = quoted_text(context);
        let analysis = tools.analyze_human_statement(statement);

        let seed = self.profile.id.bytes().map(usize::from).sum::<usize>();
        let opener = OPENERS[(seed + call as usize) % OPENERS.len()];

        debug!(
            agent_id = %self.profile.id,
            round,
            analysis = %analysis.summary(),
            "statement analysed"
        );

        if analysis.is_question {
            let ask = tools.request_clarification("everyone", "what were you all doing earlier?");
            debug!(agent_id = %self.profile.id, tool_call = %ask, "clarification");
            format!("{opener} fair question. What were you all doing earlier, though?")
        } else if analysis.hedges > 0 {
            let proposal = tools.propose_elimination("the most hesitant player", "hedging");
            debug!(agent_id = %self.profile.id, tool_call = %proposal, "proposal");
            format!("{opener} that sounds pretty unsure. Whoever hedges the most gets my vote.")
        } else if analysis.exclamations > 0 {
            format!("{opener} that's a strong take for round {round}. What makes you so sure?")
        } else {
            format!("{opener} I hear you. Speaking as someone who is {}.", self.profile.persona)
        }
    }
}

#[async_trait]
impl Responder for ScriptedAgent {
    async fn respond(&self, context: &str) -> Result<String, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let prompt = persona_prompt(&self.profile.name, &self.profile.persona, context);
        debug!(
            agent_id = %self.profile.id,
            prompt_version = PROMPT_VERSION,
            prompt_chars = prompt.len(),
            call,
            "composing reply"
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(AgentError::Inference(format!(
                "simulated failure on call {call}"
            )));
        }

        Ok(self.compose(context, call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn agent() -> ScriptedAgent {
        ScriptedAgent::new(AgentProfile::new("ai-1", "Mara", "a cat person"))
    }

    #[tokio::test]
    async fn test_reply_depends_on_statement() {
        let agent = agent();
        let question = agent
            .respond("Human said in round 1: \"Who was up late?\"")
            .await
            .unwrap();
        assert!(question.contains("fair question"));

        let hedge = agent
            .respond("Human said in round 1: \"I guess it was Theo\"")
            .await
            .unwrap();
        assert!(hedge.contains("hedges the most"));

        let plain = agent
            .respond("Human said in round 1: \"I like soup\"")
            .await
            .unwrap();
        assert!(plain.ends_with("someone who is a cat person."));
        assert_eq!(agent.calls(), 3);
    }

    #[tokio::test]
    async fn test_failure_cadence() {
        let agent = agent().failing_every(2);
        assert!(agent.respond("x").await.is_ok());
        assert!(matches!(
            agent.respond("x").await,
            Err(AgentError::Inference(_))
        ));
        assert!(agent.respond("x").await.is_ok());
        assert!(agent.respond("x").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let agent = agent().with_latency(Duration::from_millis(750));
        let start = Instant::now();
        agent.respond("Human said in round 2: \"hey!\"").await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(750));
    }
}
