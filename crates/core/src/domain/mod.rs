pub mod item;
pub mod matching;
pub mod product;
