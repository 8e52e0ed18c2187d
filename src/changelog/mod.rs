pub mod changelog;
pub mod memory_changelog;
pub mod sqlite_changelog;

pub use changelog::*;
pub use memory_changelog::*;
pub use sqlite_changelog::*;
