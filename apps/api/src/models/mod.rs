pub mod candidate;
pub mod interview;
