pub mod demo;
pub mod search;
