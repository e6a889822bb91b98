// Application layer - Use case interactors

pub mod container;
pub mod slice_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use slice_interactor::{BatchManifest, BoundedSlicer};
