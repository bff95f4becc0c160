pub mod item;
pub mod item_group;
pub mod item_image;
pub mod item_tag;
pub mod location;
pub mod tag;
pub mod user;
