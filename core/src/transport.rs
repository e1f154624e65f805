//! CLI transport seam between the file-operation engine and the device.
//!
//! The core crate defines *what* to send; consumers inject *how* it reaches
//! the device (SSH, telnet, a serial console server). The transport is
//! assumed to be already authenticated and positioned at the device's
//! file-management command context. In tests and demos the seam is backed
//! by [`DeviceEmulator`](crate::emulator::DeviceEmulator) instead of real
//! hardware.

use crate::errors::TransportError;

/// A blocking command/response channel to the device CLI.
///
/// The device's CLI is a single sequential session: one command in flight
/// at a time, and the response to a command must be fully collected before
/// the next command is issued. `send` therefore takes `&mut self` and
/// resolves only when the device-side interaction for that command has
/// finished.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send one command and return the device's full textual response.
    async fn send(&mut self, command: &str) -> Result<String, TransportError>;
}
