//! Interaction state machine sequencing a kiosk session

pub mod machine;
pub mod side_tasks;
pub mod state;

pub use machine::{load_test_image, Kiosk, KioskOptions};
pub use side_tasks::{SideTaskReport, SideTasks};
pub use state::{KioskEvent, KioskState, StateChange};
