pub mod stage0_extract;
pub mod stage1_mapping;
pub mod stage2_safeguard;

pub use stage0_extract::*;
pub use stage1_mapping::*;
pub use stage2_safeguard::*;
