pub mod point;
pub mod value;
