mod agent_loop;

pub use agent_loop::{AgentConfig, AgentError, AgentLoop, RunOutcome};
