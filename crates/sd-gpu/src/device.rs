//! Shared graphics device
//!
//! Every editor window in the process renders with the same device. The
//! registry creates it on the first [`DeviceRegistry::retain`]; leases hold
//! the only strong references, so it is destroyed when the last
//! [`DeviceLease`] drops.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::{GpuBackend, GpuResult};

struct RegistryState<D> {
    retain_count: usize,
    device: Weak<D>,
}

pub struct DeviceRegistry<B: GpuBackend> {
    backend: B,
    state: Mutex<RegistryState<B::Device>>,
}

impl<B: GpuBackend> DeviceRegistry<B> {
    pub fn new(backend: B) -> Arc<Self> {
        Arc::new(Self {
            backend,
            state: Mutex::new(RegistryState {
                retain_count: 0,
                device: Weak::new(),
            }),
        })
    }

    /// Process-wide registry, created on first use
    pub fn global(cell: &'static OnceLock<Arc<Self>>, make: impl FnOnce() -> B) -> Arc<Self> {
        cell.get_or_init(|| Self::new(make())).clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Take a reference on the device, creating it if this is the first.
    ///
    /// A failed creation leaves the count untouched.
    pub fn retain(self: &Arc<Self>, debug_layer: bool) -> GpuResult<DeviceLease<B>> {
        let mut state = self.state.lock();

        // A lease still being dropped keeps the old device reachable
        let device = match state.device.upgrade() {
            Some(device) => device,
            None => {
                let device = Arc::new(self.backend.create_device(debug_layer)?);
                log::info!(
                    "{} device created (debug layer: {})",
                    self.backend.name(),
                    debug_layer
                );
                state.device = Arc::downgrade(&device);
                device
            }
        };

        state.retain_count += 1;
        log::debug!("Device retained ({} users)", state.retain_count);

        Ok(DeviceLease {
            device,
            registry: Arc::clone(self),
        })
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.retain_count = state.retain_count.saturating_sub(1);
        log::debug!("Device released ({} users)", state.retain_count);

        if state.retain_count == 0 {
            log::info!("{} device released by its last user", self.backend.name());
        }
    }

    pub fn retain_count(&self) -> usize {
        self.state.lock().retain_count
    }

    /// Whether a device currently exists
    pub fn is_live(&self) -> bool {
        self.state.lock().device.strong_count() > 0
    }
}

/// One user's reference on the shared device
pub struct DeviceLease<B: GpuBackend> {
    device: Arc<B::Device>,
    registry: Arc<DeviceRegistry<B>>,
}

impl<B: GpuBackend> DeviceLease<B> {
    #[inline]
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.registry.backend
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry<B>> {
        &self.registry
    }
}

impl<B: GpuBackend> Drop for DeviceLease<B> {
    fn drop(&mut self) {
        // `device` drops right after, with the lease's fields
        self.registry.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessBackend, ResourceKind};

    #[test]
    fn test_last_lease_destroys_device() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let registry = DeviceRegistry::new(backend);

        let first = registry.retain(false).unwrap();
        let second = registry.retain(false).unwrap();
        assert_eq!(stats.devices_created(), 1);
        assert_eq!(registry.retain_count(), 2);

        drop(first);
        assert!(registry.is_live());
        assert_eq!(stats.live(ResourceKind::Device), 1);

        drop(second);
        assert_eq!(registry.retain_count(), 0);
        assert!(!registry.is_live());
        assert_eq!(stats.live(ResourceKind::Device), 0);
    }

    #[test]
    fn test_retain_after_release_creates_fresh_device() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let registry = DeviceRegistry::new(backend);

        drop(registry.retain(false).unwrap());
        let lease = registry.retain(true).unwrap();
        assert_eq!(stats.devices_created(), 2);
        assert!(lease.device().debug_layer());
        assert_eq!(stats.live(ResourceKind::Device), 1);
    }

    #[test]
    fn test_failed_create_leaves_count() {
        let backend = HeadlessBackend::new();
        let stats = backend.stats();
        let registry = DeviceRegistry::new(backend);

        stats.fail_next(ResourceKind::Device);
        assert!(registry.retain(false).is_err());
        assert_eq!(registry.retain_count(), 0);
        assert!(!registry.is_live());
    }
}
