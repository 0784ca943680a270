mod profile;
mod proof;
mod week;

pub use profile::*;
pub use proof::*;
pub use week::*;
