// Resource declaration and data access
// A Resource says what an entity exposes; a Repository says where its rows come from

pub mod repository;
pub mod traits;

// Re-export commonly used items
pub use repository::DbRepository;
pub use traits::{Repository, Resource};
