pub mod conversation;
pub mod intent;
pub mod planner;
pub mod preference_adapter;
pub mod runner;
pub mod session;

pub use conversation::{Conversation, ConversationResult};
pub use intent::{Intent, IntentClassifier};
pub use planner::{rewrite_references, PlanRule, TaskPlanner};
pub use preference_adapter::PreferenceStoreAdapter;
pub use runner::{Pipeline, PlanRunner};
pub use session::Session;
