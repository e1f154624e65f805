//! Shared fixtures: the reference device listings and session plumbing.

#![allow(dead_code)]

use flashwire_core::emulator::{Action, DeviceEmulator};
use flashwire_core::session::FlashSession;
use flashwire_core::transfer::Station;

/// Address the synthesized copy commands embed in these tests.
pub const STATION_ADDR: &str = "127.0.0.1";

/// Flash contents before any test file is created.
pub const BASE_ROWS: [&str; 10] = [
    "starts                  rw       524288      982     01-Oct-2006 01:12:44",
    "image-1                 rw      5242880    4325376   01-Jan-2000 01:07:08",
    "image-2                 rw      5242880    4325376   01-Oct-2006 01:28:04",
    "dhcpsn.prv              --       131072      --      01-Jan-2000 01:02:12",
    "sshkeys.prv             --       262144      --      01-Oct-2006 01:01:16",
    "syslog1.sys             r-       262144      --      01-Oct-2006 01:03:28",
    "syslog2.sys             r-       262144      --      01-Oct-2006 01:03:28",
    "video-2.cfg             rw       524288      154     01-Oct-2006 01:02:36",
    "directry.prv            --       262144      --      01-Jan-2000 01:02:12",
    "startup-config          rw       524288      437     01-Oct-2006 02:07:34",
];

/// Build a complete `dir` response: the base rows plus `extra_rows`.
pub fn listing_with(extra_rows: &[&str]) -> String {
    let mut out = String::from(
        "\nDirectory of flash:\n\n     File Name      Permission Flash Size Data Size        Modified\n------------------- ---------- ---------- --------- -----------------------\n",
    );
    for row in BASE_ROWS {
        out.push_str(row);
        out.push('\n');
    }
    for row in extra_rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push_str("\nTotal size of flash: 15990784 bytes\nFree size of flash: 3276800 bytes\n\n");
    out
}

/// Script the `dir` response for one state.
pub fn dir_cmd(dut: &mut DeviceEmulator, state: u32, listing: &str) {
    dut.add(
        state,
        "dir",
        Action::Emit {
            text: listing.to_string(),
        },
    );
}

/// Script a mutating command that moves the device to the next state.
pub fn set_state(dut: &mut DeviceEmulator, state: u32, command: &str, next: u32) {
    dut.add(state, command, Action::Transition { next });
}

/// Open a session over the scripted device with a fresh exchange directory.
pub async fn open_session(
    dut: DeviceEmulator,
) -> (tempfile::TempDir, FlashSession<DeviceEmulator>) {
    let dir = tempfile::tempdir().unwrap();
    let station = Station::new(dir.path().join("exchange"), STATION_ADDR).unwrap();
    let mut session = FlashSession::new(dut, station);
    session.open().await.unwrap();
    (dir, session)
}
