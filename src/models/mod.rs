pub mod correction;
pub mod log;
pub mod roles;
pub mod transcript;

pub use correction::*;
pub use log::*;
pub use roles::*;
pub use transcript::*;
