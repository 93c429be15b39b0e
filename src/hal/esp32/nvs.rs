//! Node identity persisted in the default NVS partition.

use crate::identity::IdentityStore;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

const NAMESPACE: &str = "loconode";
const KEY: &str = "identity";

/// [`IdentityStore`] backed by NVS.
pub struct Esp32IdentityStore {
    nvs: EspNvs<NvsDefault>,
}

impl Esp32IdentityStore {
    /// Opens the `loconode` namespace read-write.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be opened.
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, EspError> {
        Ok(Self {
            nvs: EspNvs::new(partition, NAMESPACE, true)?,
        })
    }
}

impl IdentityStore for Esp32IdentityStore {
    type Error = EspError;

    fn load(&mut self) -> Result<Option<u16>, EspError> {
        self.nvs.get_u16(KEY)
    }

    fn store(&mut self, id: u16) -> Result<(), EspError> {
        self.nvs.set_u16(KEY, id)
    }
}
