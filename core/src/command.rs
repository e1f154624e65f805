//! File-operation validation and CLI command synthesis.
//!
//! Pure decision logic: an operation, a [`CopyParams`] bag, and the current
//! inventory go in; a [`CopyPlan`] (the exact command string plus a staging
//! directive) or a [`FileError`] comes out. Nothing here touches the
//! transport or the filesystem; the session performs the plan.
//!
//! Validation order is observable through the failure conditions and is
//! fixed: existence checks first, then the rename-collision check, then the
//! protocol, then the source combination, then remote-name resolution.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::FileError;
use crate::flash::Inventory;

/// CLI command that prints the flash directory listing.
pub const LIST_COMMAND: &str = "dir";

/// The only transfer protocol the engine speaks.
pub const PROTOCOL_TFTP: &str = "tftp";

/// Parameter bag for create/update operations.
///
/// `port` configures the side-channel listener only; synthesized commands
/// never carry a port; the device always dials the well-known one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyParams {
    /// Transfer protocol identifier; everything but `tftp` fails closed.
    pub protocol: String,
    /// Inline content to stage and transfer.
    pub text: Option<String>,
    /// Path to a client-side file to transfer instead of `text`.
    pub filename: Option<PathBuf>,
    /// Transfer server host; defaults to the session's own station.
    pub server: Option<String>,
    /// Side-channel listener port.
    pub port: Option<u16>,
    /// Rename target, update only.
    pub new_name: Option<String>,
}

impl Default for CopyParams {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_TFTP.to_string(),
            text: None,
            filename: None,
            server: None,
            port: None,
            new_name: None,
        }
    }
}

impl CopyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }
}

/// What must be made available at the transfer station before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageSource {
    /// Inline text, staged under the remote name.
    Text(String),
    /// A client-side file, staged under its base name. When the path does
    /// not exist on the client host the object is assumed to already live
    /// on the transfer server.
    LocalFile(PathBuf),
    /// A zero-byte placeholder staged under the remote name.
    Empty,
}

/// A validated copy operation, ready to stage and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    /// Exact CLI command to send to the device.
    pub command: String,
    /// Device-side name the operation targets (`new_name` for renames).
    pub target: String,
    /// Object name on the transfer server.
    pub remote_name: String,
    /// Staging directive for the station.
    pub source: StageSource,
}

/// Validate a create request and synthesize its copy command.
pub fn plan_create(
    inventory: &Inventory,
    name: &str,
    params: &CopyParams,
    station_addr: &str,
) -> Result<CopyPlan, FileError> {
    if inventory.contains(name) {
        return Err(FileError::AlreadyExists(name.to_string()));
    }
    if params.text.is_some() && params.filename.is_some() {
        return Err(FileError::CreateSourceConflict);
    }
    check_protocol(&params.protocol)?;
    // Unlike update, create with neither source is legal: an empty file is
    // staged under the target name and pushed.
    let (remote_name, source) = resolve_source(params, name)?;
    Ok(copy_plan(params, station_addr, name, remote_name, source))
}

/// Validate an update request and synthesize its copy command.
pub fn plan_update(
    inventory: &Inventory,
    name: &str,
    params: &CopyParams,
    station_addr: &str,
) -> Result<CopyPlan, FileError> {
    if !inventory.contains(name) {
        return Err(FileError::NotFound(name.to_string()));
    }
    if let Some(new_name) = &params.new_name {
        if inventory.contains(new_name) {
            return Err(FileError::CannotOverwrite(new_name.clone()));
        }
    }
    check_protocol(&params.protocol)?;
    match (&params.filename, &params.text) {
        (Some(_), Some(_)) => return Err(FileError::UpdateSourceConflict),
        (None, None) => return Err(FileError::UpdateSourceMissing),
        _ => {}
    }
    let target = params.new_name.clone().unwrap_or_else(|| name.to_string());
    let (remote_name, source) = resolve_source(params, &target)?;
    Ok(copy_plan(params, station_addr, &target, remote_name, source))
}

/// Validate a delete request and synthesize its command.
pub fn plan_delete(inventory: &Inventory, name: &str) -> Result<String, FileError> {
    inventory.get(name)?;
    Ok(format!("delete {name}"))
}

/// Synthesize the command that makes the device push `name` to the station,
/// for a lazy content fetch.
pub fn plan_fetch(
    inventory: &Inventory,
    name: &str,
    station_addr: &str,
) -> Result<String, FileError> {
    inventory.get(name)?;
    Ok(format!("copy {name} {PROTOCOL_TFTP}://{station_addr}/{name}"))
}

fn check_protocol(protocol: &str) -> Result<(), FileError> {
    if protocol != PROTOCOL_TFTP {
        return Err(FileError::ProtocolUnsupported(protocol.to_string()));
    }
    Ok(())
}

/// Resolve the remote object name and staging directive for a copy.
///
/// With an explicit `server` the station cannot stage anything there, so a
/// remote object name must come from `filename`; inline text (or nothing
/// at all) cannot name a remote object.
fn resolve_source(params: &CopyParams, target: &str) -> Result<(String, StageSource), FileError> {
    if let Some(path) = &params.filename {
        let remote = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(FileError::RemoteNameMissing)?;
        return Ok((remote, StageSource::LocalFile(path.clone())));
    }
    if let Some(text) = &params.text {
        if params.server.is_some() {
            return Err(FileError::RemoteNameMissing);
        }
        return Ok((target.to_string(), StageSource::Text(text.clone())));
    }
    if params.server.is_some() {
        return Err(FileError::RemoteNameMissing);
    }
    Ok((target.to_string(), StageSource::Empty))
}

fn copy_plan(
    params: &CopyParams,
    station_addr: &str,
    target: &str,
    remote_name: String,
    source: StageSource,
) -> CopyPlan {
    let server = params.server.as_deref().unwrap_or(station_addr);
    CopyPlan {
        command: format!("copy {}://{}/{} {}", params.protocol, server, remote_name, target),
        target: target.to_string(),
        remote_name,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::parse_listing;

    const STATION: &str = "10.17.39.11";

    const SAMPLE: &str = "
Directory of flash:

     File Name      Permission Flash Size Data Size        Modified
------------------- ---------- ---------- --------- -----------------------
image-1                 rw      5242880    4325376   01-Jan-2000 01:07:08
startup-config          rw       524288      437     01-Oct-2006 02:07:34
test_file_1.cfg         rw       131072      284     20-Jun-2014 11:49:22

Total size of flash: 15990784 bytes
Free size of flash: 3276800 bytes
";

    fn inventory() -> Inventory {
        let mut inventory = Inventory::new();
        inventory.replace(parse_listing(SAMPLE).unwrap());
        inventory
    }

    // -- create ------------------------------------------------------------

    #[test]
    fn create_with_text_synthesizes_copy_command() {
        let params = CopyParams::new().text("hostname nac_dev\n");
        let plan = plan_create(&inventory(), "video-3.cfg", &params, STATION).unwrap();
        assert_eq!(
            plan.command,
            "copy tftp://10.17.39.11/video-3.cfg video-3.cfg"
        );
        assert_eq!(plan.target, "video-3.cfg");
        assert_eq!(plan.remote_name, "video-3.cfg");
        assert_eq!(plan.source, StageSource::Text("hostname nac_dev\n".into()));
    }

    #[test]
    fn create_with_filename_uses_base_name_and_given_server() {
        let params = CopyParams::new()
            .filename("/tmp/staging/temp_1.cfg")
            .server("10.17.90.1");
        let plan = plan_create(&inventory(), "test_file_9.cfg", &params, STATION).unwrap();
        assert_eq!(
            plan.command,
            "copy tftp://10.17.90.1/temp_1.cfg test_file_9.cfg"
        );
        assert_eq!(
            plan.source,
            StageSource::LocalFile(PathBuf::from("/tmp/staging/temp_1.cfg"))
        );
    }

    #[test]
    fn create_with_no_source_stages_an_empty_file() {
        let params = CopyParams::new();
        let plan = plan_create(&inventory(), "test_file_3.cfg", &params, STATION).unwrap();
        assert_eq!(
            plan.command,
            "copy tftp://10.17.39.11/test_file_3.cfg test_file_3.cfg"
        );
        assert_eq!(plan.source, StageSource::Empty);
    }

    #[test]
    fn create_existing_name_fails() {
        let params = CopyParams::new().text("x");
        let err = plan_create(&inventory(), "startup-config", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "file startup-config is already existing");
    }

    #[test]
    fn create_with_both_sources_fails() {
        let params = CopyParams::new().text("x").filename("startup-config");
        let err = plan_create(&inventory(), "test_file.cfg", &params, STATION).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot have both source device file name and host string not empty"
        );
    }

    #[test]
    fn create_with_server_but_no_source_fails() {
        let params = CopyParams::new().server("10.17.90.1");
        let err = plan_create(&inventory(), "test_file.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "remote file name missing");
    }

    #[test]
    fn create_with_text_and_foreign_server_fails() {
        let params = CopyParams::new().text("x").server("10.17.90.1");
        let err = plan_create(&inventory(), "test_file.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "remote file name missing");
    }

    #[test]
    fn create_with_unsupported_protocol_fails() {
        let params = CopyParams::new()
            .protocol("http")
            .text("x")
            .server("10.17.90.1");
        let err = plan_create(&inventory(), "test_file.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "protocol http not supported");
    }

    #[test]
    fn create_existence_check_precedes_source_checks() {
        // An existing target reports the existence failure even when the
        // source combination is also invalid.
        let params = CopyParams::new().text("x").filename("y");
        let err = plan_create(&inventory(), "startup-config", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "file startup-config is already existing");
    }

    // -- update ------------------------------------------------------------

    #[test]
    fn update_with_text_targets_the_same_name() {
        let params = CopyParams::new().text("vlan database\n");
        let plan = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap();
        assert_eq!(
            plan.command,
            "copy tftp://10.17.39.11/test_file_1.cfg test_file_1.cfg"
        );
        assert_eq!(plan.target, "test_file_1.cfg");
    }

    #[test]
    fn update_with_new_name_targets_the_new_name() {
        let params = CopyParams::new().text("x").new_name("test_file_4.cfg");
        let plan = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap();
        assert_eq!(
            plan.command,
            "copy tftp://10.17.39.11/test_file_4.cfg test_file_4.cfg"
        );
        assert_eq!(plan.target, "test_file_4.cfg");
        assert_eq!(plan.remote_name, "test_file_4.cfg");
    }

    #[test]
    fn update_missing_name_fails() {
        let params = CopyParams::new().text("x");
        let err = plan_update(&inventory(), "test_file_3.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "file test_file_3.cfg does not exist");
    }

    #[test]
    fn update_rename_onto_existing_file_fails() {
        let params = CopyParams::new().text("x").new_name("startup-config");
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "file startup-config cannot be overwritten");
    }

    #[test]
    fn update_with_no_source_fails() {
        let params = CopyParams::new();
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot have both host file name and host string empty"
        );
    }

    #[test]
    fn update_with_both_sources_fails() {
        let params = CopyParams::new().text("x").filename("host_temp.cfg");
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot have both host file name and host string not empty"
        );
    }

    #[test]
    fn update_with_text_and_foreign_server_fails() {
        let params = CopyParams::new().text("x").server("10.17.90.1");
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "remote file name missing");
    }

    #[test]
    fn update_with_server_only_reports_empty_sources() {
        // The source-combination rule fires before remote-name resolution.
        let params = CopyParams::new().server("10.17.90.1");
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot have both host file name and host string empty"
        );
    }

    #[test]
    fn update_protocol_checked_before_source_combination() {
        let params = CopyParams::new().protocol("http").server("10.17.90.1");
        let err = plan_update(&inventory(), "test_file_1.cfg", &params, STATION).unwrap_err();
        assert_eq!(err.to_string(), "protocol http not supported");
    }

    // -- delete / fetch ----------------------------------------------------

    #[test]
    fn delete_synthesizes_command() {
        let command = plan_delete(&inventory(), "test_file_1.cfg").unwrap();
        assert_eq!(command, "delete test_file_1.cfg");
    }

    #[test]
    fn delete_missing_name_fails() {
        let err = plan_delete(&inventory(), "test_file_x.cfg").unwrap_err();
        assert_eq!(err.to_string(), "file test_file_x.cfg does not exist");
    }

    #[test]
    fn fetch_synthesizes_push_command() {
        let command = plan_fetch(&inventory(), "startup-config", STATION).unwrap();
        assert_eq!(
            command,
            "copy startup-config tftp://10.17.39.11/startup-config"
        );
    }

    #[test]
    fn fetch_missing_name_fails() {
        let err = plan_fetch(&inventory(), "video-3.cfg", STATION).unwrap_err();
        assert_eq!(err.to_string(), "file video-3.cfg does not exist");
    }
}
