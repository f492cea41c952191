use cpal::{Device, Host, SupportedStreamConfig};
use cpal::traits::{DeviceTrait, HostTrait};
use log::{debug, warn};
use crate::error::AudioError;

/// What a listed output device offers by default
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Manages output device enumeration and selection
pub struct DeviceManager {
    host: Host,
    devices: Vec<(DeviceInfo, Device)>,
    current_device: Option<Device>,
}

impl DeviceManager {
    /// Enumerate the default host's output devices
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let mut manager = DeviceManager {
            host,
            devices: Vec::new(),
            current_device: None,
        };

        manager.refresh_devices()?;
        Ok(manager)
    }

    /// Re-scan the host, dropping devices that vanished
    pub fn refresh_devices(&mut self) -> Result<(), AudioError> {
        self.devices.clear();

        let devices = self.host.output_devices()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to enumerate devices: {}", e)))?;

        for device in devices {
            // A device that cannot report a name or config is unusable; skip it
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    debug!("Skipping unnamed output device: {}", e);
                    continue;
                }
            };

            match device.default_output_config() {
                Ok(config) => {
                    let info = DeviceInfo {
                        name,
                        sample_rate: config.sample_rate().0,
                        channels: config.channels(),
                    };
                    self.devices.push((info, device));
                }
                Err(e) => debug!("Skipping output device {}: {}", name, e),
            }
        }

        Ok(())
    }

    /// Names of all available output devices, in host order
    pub fn list_devices(&self) -> Vec<String> {
        self.devices.iter().map(|(info, _)| info.name.clone()).collect()
    }

    pub fn device_info(&self) -> Vec<DeviceInfo> {
        self.devices.iter().map(|(info, _)| info.clone()).collect()
    }

    /// Select a device by name, or the default device when no name is given
    pub fn select_device(&mut self, device_name: Option<&str>) -> Result<(), AudioError> {
        match device_name {
            Some(name) => {
                let device = self.devices.iter()
                    .find(|(info, _)| info.name == name)
                    .map(|(_, device)| device.clone())
                    .ok_or_else(|| AudioError::DeviceNotFound {
                        device: name.to_string(),
                    })?;
                self.current_device = Some(device);
                Ok(())
            }
            None => self.select_default_device(),
        }
    }

    /// Select a device by name, falling back to the default device
    pub fn select_device_with_fallback(&mut self, device_name: Option<&str>) -> Result<(), AudioError> {
        match self.select_device(device_name) {
            Err(AudioError::DeviceNotFound { device }) => {
                warn!("Output device '{}' not found, using the default device", device);
                self.select_default_device()
                    .map_err(|_| AudioError::DeviceNotFound { device })
            }
            other => other,
        }
    }

    /// Use whatever the host considers the default
    pub fn select_default_device(&mut self) -> Result<(), AudioError> {
        let default_device = self.host.default_output_device()
            .ok_or_else(|| AudioError::InitializationFailed("No default output device available".to_string()))?;

        self.current_device = Some(default_device);
        Ok(())
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current_device.as_ref()
    }

    pub fn current_device_name(&self) -> Result<Option<String>, AudioError> {
        match &self.current_device {
            Some(device) => {
                let name = device.name()
                    .map_err(|e| AudioError::InitializationFailed(format!("Failed to get device name: {}", e)))?;
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }

    /// Default stream configuration of the selected device
    pub fn current_config(&self) -> Result<SupportedStreamConfig, AudioError> {
        let device = self.current_device()
            .ok_or_else(|| AudioError::InitializationFailed("No device selected".to_string()))?;

        device.default_output_config()
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to get default config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hosts without audio hardware may fail to enumerate; those runs only check the error path.

    #[test]
    fn test_device_names_are_not_empty() {
        if let Ok(manager) = DeviceManager::new() {
            for device_name in manager.list_devices() {
                assert!(!device_name.is_empty(), "Device name should not be empty");
            }
            assert_eq!(manager.device_info().len(), manager.list_devices().len());
        }
    }

    #[test]
    fn test_invalid_device_selection() {
        if let Ok(mut manager) = DeviceManager::new() {
            let result = manager.select_device(Some("NonExistentDevice"));

            match result {
                Err(AudioError::DeviceNotFound { device }) => {
                    assert_eq!(device, "NonExistentDevice");
                }
                _ => panic!("Expected DeviceNotFound error"),
            }
            assert!(manager.current_device().is_none());
        }
    }

    #[test]
    fn test_no_current_device_initially() {
        if let Ok(manager) = DeviceManager::new() {
            assert!(manager.current_device().is_none());
            assert_eq!(manager.current_device_name().ok(), Some(None));
            assert!(manager.current_config().is_err());
        }
    }

    #[test]
    fn test_selection_by_listed_name() {
        if let Ok(mut manager) = DeviceManager::new() {
            if let Some(first_device) = manager.list_devices().first().cloned() {
                assert!(manager.select_device(Some(&first_device)).is_ok());
                assert!(manager.current_device().is_some());
            }
        }
    }
}
