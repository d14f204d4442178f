//! Resource controllers
//!
//! One controller per managed resource type. Each exposes create, read,
//! update, delete and import over a shared `ControlPlane` client.

mod collection;
mod index;

pub use collection::{CollectionPlan, CollectionResource, CollectionState};
pub use index::{IndexPlan, IndexResource, IndexState};
