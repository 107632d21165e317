pub mod fields;
pub mod interview;
pub mod persona;
