//! Device registry: handle lifecycle and enumeration
//!
//! The registry is an explicitly owned object, constructed once and passed
//! by reference to everything that needs a device; there is no process-wide
//! singleton. All registry mutations serialize under one mutex, so two
//! callers can never grab the same physical device simultaneously.
//!
//! Handle values are allocated monotonically and never reused: a stale
//! handle can never silently alias a device grabbed later.

use crate::device::{self, DeviceState};
use crate::error::{Result, StageError};
use parking_lot::Mutex;
use stagedrive_adapter::StageAdapter;
use stagedrive_protocol::{Command, Response};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Opaque identifier granting exclusive logical access to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i32);

impl Handle {
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Reconstruct a handle from its raw value, e.g. one carried across a
    /// foreign boundary. Validity is only decided by the registry.
    pub fn from_raw(raw: i32) -> Self {
        Handle(raw)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An attached transport that is not currently granted to anyone.
struct PooledDevice {
    serial: u32,
    adapter: Box<dyn StageAdapter>,
}

struct Granted {
    serial: u32,
    state: Arc<Mutex<DeviceState>>,
}

#[derive(Default)]
struct Inner {
    next_handle: i32,
    pool: Vec<PooledDevice>,
    granted: HashMap<Handle, Granted>,
}

impl Inner {
    fn handle_by_serial(&self, serial: u32) -> Option<Handle> {
        self.granted
            .iter()
            .find(|(_, g)| g.serial == serial)
            .map(|(h, _)| *h)
    }

    fn allocate(&mut self) -> Handle {
        self.next_handle += 1;
        Handle(self.next_handle)
    }

    fn grant(&mut self, pooled: PooledDevice) -> Result<Handle> {
        let PooledDevice { serial, mut adapter } = pooled;
        let record = match device::identify(adapter.as_mut()) {
            Ok(record) => record,
            Err(err) => {
                // identification failed; the device stays attached
                self.pool.push(PooledDevice { serial, adapter });
                return Err(err);
            }
        };
        let handle = self.allocate();
        info!(%handle, serial, product_id = record.info.product_id, "device granted");
        self.granted.insert(
            handle,
            Granted {
                serial,
                state: Arc::new(Mutex::new(DeviceState { adapter, record })),
            },
        );
        Ok(handle)
    }
}

/// Process-wide set of live device handles.
pub struct DeviceRegistry {
    inner: Mutex<Inner>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register an attached transport with the registry's pool, making it
    /// grabbable. The serial number is probed up front; attaching two
    /// devices with the same serial is rejected.
    pub fn attach(&self, mut adapter: Box<dyn StageAdapter>) -> Result<()> {
        let serial = match adapter.transact(Command::GetSerialNumber)? {
            Response::Serial(serial) => serial,
            _ => return Err(StageError::UnexpectedResponse),
        };
        let mut inner = self.inner.lock();
        let duplicate = inner.pool.iter().any(|p| p.serial == serial)
            || inner.granted.values().any(|g| g.serial == serial);
        if duplicate {
            return Err(StageError::NotReady("serial already attached"));
        }
        debug!(serial, "transport attached");
        inner.pool.push(PooledDevice { serial, adapter });
        Ok(())
    }

    /// Grab an attached, ungranted device and return its handle.
    ///
    /// With a serial: that exact device; already granted fails with
    /// device-not-ready, unknown serial with device-not-attached. Without
    /// a serial: the first ungranted device.
    pub fn grab(&self, serial: Option<u32>) -> Result<Handle> {
        let mut inner = self.inner.lock();
        let index = match serial {
            Some(serial) => {
                if inner.handle_by_serial(serial).is_some() {
                    return Err(StageError::NotReady("device already grabbed"));
                }
                inner
                    .pool
                    .iter()
                    .position(|p| p.serial == serial)
                    .ok_or(StageError::NotAttached)?
            }
            None => {
                if inner.pool.is_empty() {
                    return Err(StageError::NotAttached);
                }
                0
            }
        };
        let pooled = inner.pool.remove(index);
        inner.grant(pooled)
    }

    /// Idempotent grab: if the device is already granted, return the
    /// existing handle instead of failing.
    ///
    /// Without a serial, an ungranted device is grabbed if one exists;
    /// otherwise the lowest already-granted handle is returned.
    pub fn grab_or_existing(&self, serial: Option<u32>) -> Result<Handle> {
        {
            let inner = self.inner.lock();
            match serial {
                Some(serial) => {
                    if let Some(handle) = inner.handle_by_serial(serial) {
                        return Ok(handle);
                    }
                }
                None => {
                    if inner.pool.is_empty() {
                        if let Some(handle) = inner.granted.keys().min().copied() {
                            return Ok(handle);
                        }
                    }
                }
            }
        }
        self.grab(serial)
    }

    /// Grab every attached, ungranted device. Returns the newly granted
    /// handles; devices that fail identification are skipped and stay
    /// attached.
    pub fn grab_all(&self) -> Vec<Handle> {
        let mut inner = self.inner.lock();
        let mut handles = Vec::new();
        let pool = std::mem::take(&mut inner.pool);
        for pooled in pool {
            let serial = pooled.serial;
            match inner.grant(pooled) {
                Ok(handle) => handles.push(handle),
                Err(err) => warn!(serial, %err, "skipping device during grab_all"),
            }
        }
        handles
    }

    /// Enumerate granted handles, bounded by `capacity`. Truncates
    /// silently if more handles exist; the returned length is the actual
    /// count produced.
    pub fn list_handles(&self, capacity: usize) -> Vec<Handle> {
        let inner = self.inner.lock();
        let mut handles: Vec<Handle> = inner.granted.keys().copied().collect();
        handles.sort();
        handles.truncate(capacity);
        handles
    }

    /// Number of handles currently granted.
    pub fn count(&self) -> usize {
        self.inner.lock().granted.len()
    }

    /// Release a handle, destroying its record (armed waveform state
    /// included) and returning the transport to the attached pool.
    ///
    /// Releasing an unknown handle reports the invalid-handle condition
    /// and has no side effects.
    pub fn release(&self, handle: Handle) -> Result<()> {
        let mut inner = self.inner.lock();
        let granted = inner
            .granted
            .remove(&handle)
            .ok_or(StageError::InvalidHandle(handle))?;
        info!(%handle, serial = granted.serial, "handle released");
        match Arc::try_unwrap(granted.state) {
            Ok(state) => {
                let state = state.into_inner();
                inner.pool.push(PooledDevice {
                    serial: granted.serial,
                    adapter: state.adapter,
                });
            }
            Err(_) => {
                // an operation is still in flight on another thread;
                // callers are required to stop before releasing, so the
                // transport is abandoned rather than handed out twice
                warn!(%handle, "released while an operation was in flight; transport dropped");
            }
        }
        Ok(())
    }

    /// Release every granted handle. Afterwards `count()` is zero and no
    /// previously issued handle remains valid.
    pub fn release_all(&self) {
        let handles = self.list_handles(usize::MAX);
        for handle in handles {
            // unknown handles cannot occur here; errors would only repeat
            // the invalid-handle report release() already gives callers
            let _ = self.release(handle);
        }
    }

    /// Per-handle operation facade. Construction never fails; each
    /// operation on the returned [`Stage`] re-resolves the handle and
    /// reports invalid-handle once it has been released.
    pub fn stage(&self, handle: Handle) -> Stage<'_> {
        Stage {
            registry: self,
            handle,
        }
    }

    pub(crate) fn state(&self, handle: Handle) -> Result<Arc<Mutex<DeviceState>>> {
        let inner = self.inner.lock();
        inner
            .granted
            .get(&handle)
            .map(|g| Arc::clone(&g.state))
            .ok_or(StageError::InvalidHandle(handle))
    }
}

/// Handle-bound operation surface.
///
/// Motion, waveform, clock and telemetry operations are implemented on
/// this type in their respective modules. Every call locks the per-handle
/// device state for its full duration, serializing access to the
/// underlying transport.
#[derive(Clone, Copy)]
pub struct Stage<'r> {
    registry: &'r DeviceRegistry,
    handle: Handle,
}

impl Stage<'_> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Resolve the handle and run `f` with the device locked.
    pub(crate) fn with_device<T>(&self, f: impl FnOnce(&mut DeviceState) -> Result<T>) -> Result<T> {
        let state = self.registry.state(self.handle)?;
        let mut guard = state.lock();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagedrive_adapter::{SimConfig, SimStage};

    fn registry_with(serials: &[u32]) -> DeviceRegistry {
        let registry = DeviceRegistry::new();
        for &serial in serials {
            registry
                .attach(Box::new(SimStage::new(SimConfig::piezo(serial))))
                .unwrap();
        }
        registry
    }

    #[test]
    fn grab_and_count() {
        let registry = registry_with(&[11, 12]);
        assert_eq!(registry.count(), 0);
        let a = registry.grab(None).unwrap();
        let b = registry.grab(None).unwrap();
        assert_eq!(registry.count(), 2);
        assert_ne!(a, b);
        assert!(matches!(registry.grab(None), Err(StageError::NotAttached)));
    }

    #[test]
    fn grab_by_serial_respects_grant_state() {
        let registry = registry_with(&[11, 12]);
        let a = registry.grab(Some(11)).unwrap();
        assert!(matches!(
            registry.grab(Some(11)),
            Err(StageError::NotReady(_))
        ));
        assert!(matches!(
            registry.grab(Some(99)),
            Err(StageError::NotAttached)
        ));
        assert_eq!(registry.grab_or_existing(Some(11)).unwrap(), a);
    }

    #[test]
    fn release_returns_device_to_pool() {
        let registry = registry_with(&[11]);
        let a = registry.grab(Some(11)).unwrap();
        registry.release(a).unwrap();
        assert_eq!(registry.count(), 0);
        // grabbable again, under a fresh handle value
        let b = registry.grab(Some(11)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn release_unknown_handle_is_reported() {
        let registry = registry_with(&[11]);
        let err = registry.release(Handle::from_raw(42)).unwrap_err();
        assert!(matches!(err, StageError::InvalidHandle(_)));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn list_handles_truncates_silently() {
        let registry = registry_with(&[11, 12, 13]);
        let granted = registry.grab_all();
        assert_eq!(granted.len(), 3);
        assert_eq!(registry.list_handles(2).len(), 2);
        assert_eq!(registry.list_handles(10).len(), 3);
    }

    #[test]
    fn attach_rejects_duplicate_serial() {
        let registry = registry_with(&[11]);
        let err = registry
            .attach(Box::new(SimStage::new(SimConfig::piezo(11))))
            .unwrap_err();
        assert!(matches!(err, StageError::NotReady(_)));
    }
}
