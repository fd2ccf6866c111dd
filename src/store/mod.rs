pub mod drivers;
pub mod notifications;
pub mod orders;
