pub mod hooked_executor;
pub mod hooks;
pub mod plugin_trait;

pub use hooked_executor::{wrap_with_hooks, HookedSubgraphExecutor};
pub use plugin_trait::{GatewayPlugin, GatewayPlugins};
