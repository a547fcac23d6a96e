//! Type definitions for lyceum invitation storage.

mod ids;
mod invitations;

pub use ids::*;
pub use invitations::*;
