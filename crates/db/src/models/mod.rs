pub mod operation;
pub mod shot;
pub mod status;
pub mod story;
