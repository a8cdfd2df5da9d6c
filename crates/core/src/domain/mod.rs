pub mod patch;
pub mod selections;
