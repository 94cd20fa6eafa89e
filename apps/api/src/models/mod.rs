pub mod mentee;
pub mod progress;
