pub mod lookup;
pub mod verify;

// Re-export command functions for convenience
pub use lookup::{name_string, search, source, sources};
pub use verify::verify;
