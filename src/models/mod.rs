pub mod enums;
pub mod medication;
pub mod patient;
pub mod reconciliation;

pub use medication::*;
pub use patient::*;
pub use reconciliation::*;
