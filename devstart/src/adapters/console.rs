use crate::ports::{ShutdownHook, Ui};

/// Progress messages on stdout.
#[derive(Default)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        println!("{message}");
    }
}

/// Terminates the process; the watchdog's last resort.
#[derive(Default)]
pub struct ProcessExit;

impl ShutdownHook for ProcessExit {
    fn fatal_exit(&self, code: i32) {
        tracing::error!(code, "Exiting after watchdog failure");
        std::process::exit(code);
    }
}
