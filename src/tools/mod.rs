pub mod builtin;
pub mod definition;
