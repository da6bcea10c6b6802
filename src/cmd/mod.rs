mod providers;
mod resolve;
mod serve;

pub use providers::cmd_providers;
pub use resolve::{cmd_resolve, ResolveArgs};
pub use serve::cmd_serve;
