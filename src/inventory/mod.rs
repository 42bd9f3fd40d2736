//! Items, their locations and their claims

pub mod item;
pub mod registry;

pub use item::{ClaimOwner, Item, NewItem};
pub use registry::{requirement_accepts, Inventory, ANY_MATERIAL, BED_SID};
