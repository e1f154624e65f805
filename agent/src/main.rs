//! flashwire-agent: demo and replay driver for the file-operation engine.
//!
//! Runs the full engine against the scripted device emulator (no hardware
//! required) while the TFTP side channel runs for real on loopback.

use tracing::info;
use tracing_subscriber::EnvFilter;

use flashwire_core::command::CopyParams;
use flashwire_core::emulator::{Action, DeviceEmulator};
use flashwire_core::session::FlashSession;
use flashwire_core::transfer::{tftp, Station, TftpListener};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DIR_0: &str = "
Directory of flash:

     File Name      Permission Flash Size Data Size        Modified
------------------- ---------- ---------- --------- -----------------------
image-1                 rw      5242880    4325376   01-Jan-2000 01:07:08
sshkeys.prv             --       262144      --      01-Oct-2006 01:01:16
startup-config          rw       524288      437     01-Oct-2006 02:07:34

Total size of flash: 15990784 bytes
Free size of flash: 3276800 bytes
";

const DIR_1: &str = "
Directory of flash:

     File Name      Permission Flash Size Data Size        Modified
------------------- ---------- ---------- --------- -----------------------
image-1                 rw      5242880    4325376   01-Jan-2000 01:07:08
sshkeys.prv             --       262144      --      01-Oct-2006 01:01:16
startup-config          rw       524288      437     01-Oct-2006 02:07:34
demo.cfg                rw       131072      15      20-Jun-2014 11:49:22

Total size of flash: 15990784 bytes
Free size of flash: 3276800 bytes
";

const DIR_2: &str = "
Directory of flash:

     File Name      Permission Flash Size Data Size        Modified
------------------- ---------- ---------- --------- -----------------------
image-1                 rw      5242880    4325376   01-Jan-2000 01:07:08
sshkeys.prv             --       262144      --      01-Oct-2006 01:01:16
startup-config          rw       524288      437     01-Oct-2006 02:07:34
demo.cfg                rw       131072      26      20-Jun-2014 11:52:07

Total size of flash: 15990784 bytes
Free size of flash: 3276800 bytes
";

fn print_usage() {
    eprintln!("Usage: flashwire-agent --demo");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --demo      Run a scripted create/update/delete cycle against the emulator");
    eprintln!("  --version   Print version and exit");
    eprintln!("  --help      Print this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--version" => {
            println!("flashwire-agent {}", VERSION);
            Ok(())
        }
        "--help" => {
            print_usage();
            Ok(())
        }
        "--demo" => {
            // Logs go to stderr so the inventory JSON on stdout stays clean.
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(std::io::stderr)
                .init();

            info!("flashwire-agent {} starting demo", VERSION);
            run_demo().await
        }
        other => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Script a device that moves through three listing states as the demo
/// creates, updates, and deletes `demo.cfg`.
fn scripted_device() -> DeviceEmulator {
    let mut dut = DeviceEmulator::new();
    dut.add(0, "dir", Action::Emit { text: DIR_0.into() });
    dut.add(
        0,
        "copy tftp://127.0.0.1/demo.cfg demo.cfg",
        Action::Transition { next: 1 },
    );
    dut.add(1, "dir", Action::Emit { text: DIR_1.into() });
    dut.add(
        1,
        "copy tftp://127.0.0.1/demo.cfg demo.cfg",
        Action::Transition { next: 2 },
    );
    dut.add(2, "dir", Action::Emit { text: DIR_2.into() });
    dut.add(2, "delete demo.cfg", Action::Transition { next: 0 });
    dut
}

async fn run_demo() -> anyhow::Result<()> {
    let root = std::env::temp_dir().join("flashwire-demo");
    let station = Station::new(&root, "127.0.0.1")?;
    let listener = TftpListener::bind(station.root(), "127.0.0.1:0").await?;
    info!(port = listener.port(), root = %root.display(), "side-channel listener running");

    let mut session = FlashSession::new(scripted_device(), station);
    session.open().await?;
    print_inventory(&session)?;

    session
        .create("demo.cfg", &CopyParams::new().text("ip ssh server\n"))
        .await?;
    info!("created demo.cfg");
    print_inventory(&session)?;

    // Pull the staged object over the wire, exactly as the device would.
    let pulled = tftp::fetch(listener.local_addr(), "demo.cfg").await?;
    info!(bytes = pulled.len(), "device-side TFTP pull succeeded");

    session
        .update("demo.cfg", &CopyParams::new().text("hostname nac_dev\n"))
        .await?;
    let content = session.content("demo.cfg").await?;
    info!(%content, "updated demo.cfg");
    print_inventory(&session)?;

    session.delete("demo.cfg").await?;
    info!("deleted demo.cfg");
    print_inventory(&session)?;

    listener.shutdown();
    Ok(())
}

fn print_inventory(session: &FlashSession<DeviceEmulator>) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(session.inventory().items())?
    );
    Ok(())
}
