//! Registre des équipements d'une session de découverte.

use crate::device::Device;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Équipements indexés par adresse MAC normalisée.
///
/// La première réponse reçue pour une MAC est conservée ; les suivantes sont
/// ignorées. Le registre vit le temps d'un appel à `discover`.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère `device` si sa MAC est inconnue. Retourne `true` en cas d'insertion.
    pub fn insert_if_absent(&self, device: Device) -> bool {
        let mut devices = self.devices.write();
        if devices.contains_key(&device.mac) {
            return false;
        }
        devices.insert(device.mac.clone(), device);
        true
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Copie des équipements connus, sans ordre garanti
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.read().values().cloned().collect()
    }
}
