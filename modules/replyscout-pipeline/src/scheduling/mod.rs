pub mod active_window;

pub use active_window::ActiveWindow;
