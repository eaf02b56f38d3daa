//! Postgres repositories. Each is a unit struct of static async functions.

pub mod operation_repo;
pub mod shot_repo;
pub mod story_repo;

pub use operation_repo::OperationRepo;
pub use shot_repo::ShotRepo;
pub use story_repo::StoryRepo;
