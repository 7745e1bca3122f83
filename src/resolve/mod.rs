pub mod executable; // Explicit path > toolchain > artifact
pub mod path;       // Output directory computation

pub use executable::ExecutableResolver;
pub use path::PathResolver;
