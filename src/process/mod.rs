pub mod capture;
pub mod runner;
pub mod terminal;
pub mod tickets;

pub use runner::ProcessRunner;
pub use terminal::{LaunchReport, Launcher, Platform};
pub use tickets::TicketStore;
