pub mod agent;
pub mod context;
pub mod intent;
pub mod metrics;
pub mod orchestrator;
pub mod pricing;
pub mod prompts;
pub mod runtime;
pub mod specialist;

pub use agent::{Agent, AgentCore, InvokeOptions, Invocation, SpecialistAnswer};
pub use intent::KeywordRouter;
pub use metrics::{MetricsReport, MetricsSnapshot};
pub use orchestrator::Orchestrator;
pub use pricing::PricingTable;
pub use runtime::{HealthReport, MentorRuntime};
pub use specialist::TaxSpecialist;
