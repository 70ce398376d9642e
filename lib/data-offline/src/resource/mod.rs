//! Project and resource directory tree.

mod directory;
pub use directory::*;

mod project;
pub use project::*;

mod verify;
pub use verify::*;
