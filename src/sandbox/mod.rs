pub mod platform;
pub mod supervisor;
pub mod types;
pub mod validation;

pub use supervisor::Supervisor;
pub use types::{CommandMeta, SandboxConfig, SupervisedOutput};
