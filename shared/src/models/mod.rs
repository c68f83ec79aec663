//! Vendor-neutral resource models
//!
//! These are the payloads the mirror stores for each resource kind. Types
//! shared by several vendors take a vendor-specific `extension`.

pub mod firewall;
pub mod listener;
pub mod load_balancer;
pub mod security_group;
pub mod security_group_rule;
pub mod tags;
pub mod vpc;

// Re-exports
pub use firewall::*;
pub use listener::*;
pub use load_balancer::*;
pub use security_group::*;
pub use security_group_rule::*;
pub use tags::*;
pub use vpc::*;
