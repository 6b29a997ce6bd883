pub mod payment;
pub mod restore;
pub mod user;

pub use payment::*;
pub use restore::*;
pub use user::*;
