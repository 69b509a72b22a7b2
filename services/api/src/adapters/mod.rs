pub mod chat_llm;
pub mod relay_client;

pub use chat_llm::{build_system_prompt, GatewayChatAdapter};
pub use relay_client::RelayClientAdapter;
