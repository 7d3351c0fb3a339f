pub mod controller;
pub mod gap_fill;
pub mod loop_worker;

pub use controller::ScanController;
pub use gap_fill::GapFiller;
pub use loop_worker::{scan_loop, Scanner};
