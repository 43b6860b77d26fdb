pub mod capture;
pub mod extract;
pub mod resolve;

pub use capture::*;
pub use extract::*;
pub use resolve::*;
