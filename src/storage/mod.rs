pub mod blob;
pub mod error;
pub mod index;
pub mod store;
pub mod sweeper;

pub use blob::*;
pub use error::*;
pub use index::*;
pub use store::*;
pub use sweeper::*;
