//! Registered gestures and their persistence
//!
//! - `GestureRecord` - a stored feature bound to an action
//! - `GestureStore` - the dense, id-ordered table of records backed by disk

mod record;
pub mod store;

pub use record::{Action, Feature, FeatureKind, GestureId, GestureRecord, LandmarkVector};
pub use store::{GestureStore, StorePaths, StoreStatus};
