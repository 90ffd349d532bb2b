//! Fan-out/gather over registered agents.
//!
//! Every agent is asked concurrently; every agent yields exactly one
//! [`AgentReply`]. Failures, timeouts and panics are isolated per agent and
//! replaced with the fallback text. Replies come back in the order the
//! agents were passed in, never in completion order.
//!
//! ```text
//! gather(ctx, [a1, a2, a3])
//!   JoinSet::spawn(a_i.respond(ctx)) × N
//!   join_next() → slot[i]
//!   [reply(a1), reply(a2), reply(a3)]
//! ```

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::agents::{AgentError, AgentHandle};

/// Substituted for any agent that fails to answer.
pub const DEFAULT_FALLBACK_TEXT: &str = "I need to think about that for a moment.";

/// What a single agent contributed to a gather.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The agent answered.
    Response(String),
    /// The agent failed; `text` is the fallback, `reason` is diagnostic only.
    Fallback { text: String, reason: String },
}

impl ReplyOutcome {
    /// Text to broadcast for this outcome.
    pub fn text(&self) -> &str {
        match self {
            Self::Response(text) | Self::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Response(text) | Self::Fallback { text, .. } => text,
        }
    }
}

/// One agent's outcome, paired with its identity.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub agent_id: String,
    pub outcome: ReplyOutcome,
    pub elapsed: Duration,
}

impl AgentReply {
    pub fn text(&self) -> &str {
        self.outcome.text()
    }

    pub fn is_fallback(&self) -> bool {
        self.outcome.is_fallback()
    }
}

/// Concurrent query of every agent with per-agent failure isolation.
#[derive(Debug, Clone)]
pub struct FanOutCoordinator {
    fallback_text: String,
}

impl Default for FanOutCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_TEXT)
    }
}

impl FanOutCoordinator {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self {
            fallback_text: fallback_text.into(),
        }
    }

    pub fn fallback_text(&self) -> &str {
        &self.fallback_text
    }

    /// Ask every agent to respond to `context` and wait for all of them.
    ///
    /// With `per_agent_timeout` set, an agent that has not answered in time
    /// is treated as failed. The result always has one entry per agent, in
    /// the order of `agents`.
    pub async fn gather(
        &self,
        context: &str,
        agents: &[AgentHandle],
        per_agent_timeout: Option<Duration>,
    ) -> Vec<AgentReply> {
        if agents.is_empty() {
            return Vec::new();
        }

        let mut join_set: JoinSet<(usize, AgentReply)> = JoinSet::new();

        for (index, agent) in agents.iter().enumerate() {
            let agent = agent.clone();
            let context = context.to_string();
            let fallback = self.fallback_text.clone();

            join_set.spawn(async move {
                let start = Instant::now();
                let result = match per_agent_timeout {
                    Some(limit) => match tokio::time::timeout(limit, agent.respond(&context)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(AgentError::Timeout(limit)),
                    },
                    None => agent.respond(&context).await,
                };
                let elapsed = start.elapsed();

                let outcome = match result {
                    Ok(text) => {
                        debug!(agent_id = %agent.id(), elapsed_ms = elapsed.as_millis() as u64, "agent responded");
                        ReplyOutcome::Response(text)
                    }
                    Err(e) => {
                        warn!(agent_id = %agent.id(), error = %e, "agent failed to respond, using fallback");
                        ReplyOutcome::Fallback {
                            text: fallback,
                            reason: e.to_string(),
                        }
                    }
                };

                (
                    index,
                    AgentReply {
                        agent_id: agent.id().to_string(),
                        outcome,
                        elapsed,
                    },
                )
            });
        }

        let mut slots: Vec<Option<AgentReply>> = vec![None; agents.len()];
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((index, reply)) => slots[index] = Some(reply),
                Err(e) => {
                    // The slot stays empty and is filled with the fallback below.
                    warn!(error = %e, "agent task panicked");
                }
            }
        }

        slots
            .into_iter()
            .zip(agents)
            .map(|(slot, agent)| {
                slot.unwrap_or_else(|| AgentReply {
                    agent_id: agent.id().to_string(),
                    outcome: ReplyOutcome::Fallback {
                        text: self.fallback_text.clone(),
                        reason: "agent task panicked".to_string(),
                    },
                    elapsed: Duration::ZERO,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentProfile, Responder};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Delayed {
        delay: Duration,
        reply: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl Responder for Delayed {
        async fn respond(&self, _context: &str) -> Result<String, AgentError> {
            tokio::time::sleep(self.delay).await;
            self.reply
                .map(str::to_string)
                .map_err(|e| AgentError::Inference(e.to_string()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Responder for Panics {
        async fn respond(&self, _context: &str) -> Result<String, AgentError> {
            panic!("responder blew up");
        }
    }

    fn agent(id: &str, responder: impl Responder + 'static) -> AgentHandle {
        AgentHandle::new(AgentProfile::new(id, id, ""), Arc::new(responder))
    }

    fn delayed(ms: u64, reply: Result<&'static str, &'static str>) -> Delayed {
        Delayed {
            delay: Duration::from_millis(ms),
            reply,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_follow_input_order() {
        let agents = vec![
            agent("slow", delayed(500, Ok("first"))),
            agent("fast", delayed(10, Ok("second"))),
        ];

        let replies = FanOutCoordinator::default().gather("ctx", &agents, None).await;

        let ids: Vec<_> = replies.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["slow", "fast"]);
        assert_eq!(replies[0].text(), "first");
        assert_eq!(replies[1].text(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_agents_run_concurrently() {
        let agents = vec![
            agent("a", delayed(1_000, Ok("a"))),
            agent("b", delayed(1_000, Ok("b"))),
            agent("c", delayed(1_000, Ok("c"))),
        ];

        let start = Instant::now();
        FanOutCoordinator::default().gather("ctx", &agents, None).await;
        assert!(start.elapsed() < Duration::from_millis(1_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_become_fallbacks() {
        let agents = vec![
            agent("ok-1", delayed(5, Ok("real one"))),
            agent("bad", delayed(5, Err("backend down"))),
            agent("boom", Panics),
            agent("ok-2", delayed(5, Ok("real two"))),
        ];

        let coordinator = FanOutCoordinator::new("thinking...");
        let replies = coordinator.gather("ctx", &agents, None).await;

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0].text(), "real one");
        assert!(replies[1].is_fallback());
        assert_eq!(replies[1].text(), "thinking...");
        assert_eq!(replies[2].agent_id, "boom");
        assert!(replies[2].is_fallback());
        assert_eq!(replies[3].text(), "real two");

        match &replies[1].outcome {
            ReplyOutcome::Fallback { reason, .. } => assert!(reason.contains("backend down")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_slow_agent() {
        let agents = vec![
            agent("hung", delayed(60_000, Ok("too late"))),
            agent("quick", delayed(10, Ok("on time"))),
        ];

        let start = Instant::now();
        let replies = FanOutCoordinator::default()
            .gather("ctx", &agents, Some(Duration::from_millis(200)))
            .await;

        assert!(start.elapsed() <= Duration::from_millis(250));
        assert!(replies[0].is_fallback());
        assert_eq!(replies[0].text(), DEFAULT_FALLBACK_TEXT);
        assert_eq!(replies[1].text(), "on time");
    }

    #[tokio::test]
    async fn test_empty_agent_list() {
        let replies = FanOutCoordinator::default().gather("ctx", &[], None).await;
        assert!(replies.is_empty());
    }
}
