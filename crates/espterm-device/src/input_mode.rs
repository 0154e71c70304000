//! Terminal input mode for the duplex bridge
//!
//! Keystrokes must reach the device one byte at a time and without local
//! echo, so canonical mode and echo are switched off on stdin. Signal
//! generation stays on: Ctrl+C still interrupts the session.

use std::io::IsTerminal;

use espterm_core::prelude::*;

/// RAII guard for the byte-at-a-time input mode.
/// Restores the original terminal settings when dropped, including on panic
/// unwinding and error returns.
pub struct InputModeGuard {
    #[cfg(unix)]
    original: Option<nix::sys::termios::Termios>,
}

impl InputModeGuard {
    /// Switch stdin to non-canonical, no-echo mode.
    ///
    /// When stdin is not a terminal (piped input) nothing is changed and the
    /// guard is inert.
    pub fn enable() -> Result<Self> {
        if !std::io::stdin().is_terminal() {
            info!("stdin is not a terminal, leaving input mode untouched");
            return Ok(Self::inert());
        }
        Self::enable_tty()
    }

    /// Whether dropping this guard will restore a saved mode
    pub fn is_active(&self) -> bool {
        #[cfg(unix)]
        {
            self.original.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    fn inert() -> Self {
        Self {
            #[cfg(unix)]
            original: None,
        }
    }

    #[cfg(unix)]
    fn enable_tty() -> Result<Self> {
        use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices};

        let stdin = std::io::stdin();
        let original = tcgetattr(&stdin)
            .map_err(|e| Error::TerminalMode(format!("tcgetattr: {}", e)))?;

        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        tcsetattr(&stdin, SetArg::TCSANOW, &raw)
            .map_err(|e| Error::TerminalMode(format!("tcsetattr: {}", e)))?;
        debug!("stdin switched to non-canonical, no-echo mode");

        Ok(Self {
            original: Some(original),
        })
    }

    #[cfg(not(unix))]
    fn enable_tty() -> Result<Self> {
        warn!("Byte-at-a-time input is not supported on this platform");
        Ok(Self::inert())
    }
}

impl Drop for InputModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

impl InputModeGuard {
    #[cfg(unix)]
    fn restore(&mut self) {
        use nix::sys::termios::{tcsetattr, SetArg};

        if let Some(original) = self.original.take() {
            match tcsetattr(&std::io::stdin(), SetArg::TCSANOW, &original) {
                Ok(()) => debug!("Terminal mode restored"),
                Err(e) => error!("Failed to restore terminal mode: {}", e),
            }
        }
    }

    #[cfg(not(unix))]
    fn restore(&mut self) {}
}
