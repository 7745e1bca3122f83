// Collaborator contracts live in `traits`; the rest are the concrete host implementations.

pub mod traits;     // Global contracts
pub mod protoc;     // Process execution
pub mod toolchain;  // Toolchain lookup
pub mod artifact;   // Local repository resolution

pub use artifact::LocalRepository;
pub use protoc::ProtocExecutor;
pub use toolchain::ConfiguredToolchains;
