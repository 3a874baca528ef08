pub mod bucket;
pub mod item;
