pub mod agent_store;
