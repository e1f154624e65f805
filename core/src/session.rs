//! Device session: the public file-operation surface.
//!
//! [`FlashSession`] owns the CLI transport, the [`Inventory`], and the
//! transfer [`Station`], and orchestrates create/update/delete: validate,
//! stage, send, refresh. Validation failures abort before any side effect;
//! transport failures surface verbatim with no retries, because re-issuing a
//! transfer or a mutating command without knowing whether it partially
//! applied risks corrupting device state. Callers that want retries do
//! their own `refresh()` first to observe the actual post-failure state.

use tracing::{debug, info};

use crate::command::{self, CopyParams, CopyPlan, LIST_COMMAND};
use crate::errors::CoreError;
use crate::flash::{parse_listing, Inventory};
use crate::transfer::Station;
use crate::transport::Transport;

/// A single-owner file-management session with one device.
///
/// Every operation is a blocking round trip; the device CLI handles one
/// command at a time, which `&mut self` enforces on this side.
pub struct FlashSession<T: Transport> {
    transport: T,
    station: Station,
    inventory: Inventory,
}

impl<T: Transport> FlashSession<T> {
    /// Create a session over an established, authenticated transport.
    ///
    /// The inventory starts empty; call [`open()`](Self::open) to populate
    /// it.
    pub fn new(transport: T, station: Station) -> Self {
        Self {
            transport,
            station,
            inventory: Inventory::new(),
        }
    }

    /// Initial listing refresh after the transport is positioned.
    pub async fn open(&mut self) -> Result<(), CoreError> {
        self.refresh().await
    }

    /// The last refreshed view of the device's flash directory.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// The transfer side channel this session stages through.
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Re-list the flash directory and replace the inventory wholesale.
    ///
    /// A parse failure leaves the previous inventory untouched.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        let raw = self.transport.send(LIST_COMMAND).await?;
        let listing = parse_listing(&raw)?;
        self.inventory.replace(listing);
        debug!(files = self.inventory.len(), "inventory refreshed");
        Ok(())
    }

    /// Create a new file on the device.
    pub async fn create(&mut self, name: &str, params: &CopyParams) -> Result<(), CoreError> {
        let plan = command::plan_create(&self.inventory, name, params, self.station.address())?;
        self.run_copy(plan).await
    }

    /// Overwrite (or rename via `new_name`) an existing file.
    pub async fn update(&mut self, name: &str, params: &CopyParams) -> Result<(), CoreError> {
        let plan = command::plan_update(&self.inventory, name, params, self.station.address())?;
        self.run_copy(plan).await
    }

    /// Delete an existing file.
    pub async fn delete(&mut self, name: &str) -> Result<(), CoreError> {
        let cmd = command::plan_delete(&self.inventory, name)?;
        info!(command = %cmd, "deleting device file");
        self.transport.send(&cmd).await?;
        self.refresh().await
    }

    /// Fetch a file's content.
    ///
    /// Content this session staged itself is answered from the record.
    /// Anything else is pulled through the side channel: the device is told
    /// to push the file into the station, then the staged object is read.
    pub async fn content(&mut self, name: &str) -> Result<String, CoreError> {
        if let Some(content) = self.inventory.get(name)?.content.clone() {
            return Ok(content);
        }
        let cmd = command::plan_fetch(&self.inventory, name, self.station.address())?;
        info!(command = %cmd, "fetching device file content");
        self.transport.send(&cmd).await?;
        let content = self.station.retrieve(name)?;
        self.inventory.set_content(name, content.clone());
        Ok(content)
    }

    /// Stage, send, refresh: the shared tail of create and update.
    async fn run_copy(&mut self, plan: CopyPlan) -> Result<(), CoreError> {
        let staged = self.station.stage(&plan.remote_name, &plan.source)?;
        info!(command = %plan.command, "sending copy command");
        self.transport.send(&plan.command).await?;
        self.refresh().await?;
        // The refresh rebuilt the record from the listing; re-attach the
        // bytes this session just staged so content() needs no device
        // traffic for them.
        if let Some(content) = staged {
            self.inventory.set_content(&plan.target, content);
        }
        Ok(())
    }
}
