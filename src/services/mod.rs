pub mod metrics;
pub mod paypal;
pub mod replicate;

pub use metrics::*;
pub use paypal::*;
pub use replicate::*;
