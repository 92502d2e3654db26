mod errors;
mod velocity;

pub use velocity::VelocityWindow;

pub type TransactionId = String;
