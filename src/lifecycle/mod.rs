pub mod assignment;
pub mod cancellation;
pub mod state_machine;
