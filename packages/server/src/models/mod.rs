pub mod auth;
pub mod image;
pub mod item;
pub mod item_group;
pub mod location;
pub mod shared;
pub mod tag;
