pub mod operation;
pub mod shot;
pub mod story;
