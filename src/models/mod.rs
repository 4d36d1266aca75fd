pub mod payment;
pub mod response;
pub mod state;

pub use payment::*;
pub use response::*;
pub use state::*;
