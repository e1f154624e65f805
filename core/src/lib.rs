pub mod command;
pub mod emulator;
pub mod errors;
pub mod flash;
pub mod session;
pub mod transfer;
pub mod transport;
