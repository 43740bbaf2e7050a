// ─── Launch ───
// Turns an installed version into the Java command line that starts it.

pub mod command;

pub use command::{build_command, get_classpath_separator, LaunchOptions};
