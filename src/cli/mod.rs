pub mod decrypt;
pub mod details;
pub mod encrypt;
pub mod info;
pub mod keygen;

pub use decrypt::*;
pub use details::*;
pub use encrypt::*;
pub use info::*;
pub use keygen::*;
