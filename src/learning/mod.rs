pub mod action;
pub mod agent_state;
pub mod learning_agent;
pub mod policy;
pub mod q_table;
