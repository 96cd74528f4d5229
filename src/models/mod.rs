pub mod chapter;
pub mod comic;
pub mod user;

pub use chapter::*;
pub use comic::*;
pub use user::*;
