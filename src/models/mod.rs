pub mod outcome;
pub mod profile;
pub mod question;

pub use outcome::*;
pub use profile::*;
pub use question::*;
