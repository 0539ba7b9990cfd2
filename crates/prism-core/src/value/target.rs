//! The debugging target as seen by the formatter subsystem.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use super::ValueHandle;
use crate::error::{ReadError, Result};
use crate::memory::{ByteOrder, MemorySource};
use crate::registry::FormatterRegistry;
use crate::settings::DisplaySettings;
use crate::types::{Address, TypeCatalog, TypeDescriptor};

/// Identifies one stop of the target.
///
/// Every resume, stop, or memory replacement produces a new id. Cached
/// display state is only valid for the id it was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StopId(u64);

impl StopId
{
    pub fn value(self) -> u64
    {
        self.0
    }
}

impl fmt::Display for StopId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "stop#{}", self.0)
    }
}

/// Determines the runtime type of an object from memory alone.
///
/// Implementations must not run target code; typically they read a vtable
/// pointer and map it to a class name through symbols.
pub trait DynamicTypeResolver: Send + Sync
{
    /// Name of the most-derived type of the object at `address`, or `None`
    /// if it is the static type or can't be determined.
    fn dynamic_type_name(&self, memory: &dyn MemorySource, address: Address, ty: &TypeDescriptor) -> Option<String>;
}

/// Memory, types and formatters of one stopped process (or recording).
///
/// Shared as `Arc<Target>` by every [`ValueHandle`] created from it.
pub struct Target
{
    memory: RwLock<Arc<dyn MemorySource>>,
    catalog: Arc<TypeCatalog>,
    registry: Arc<FormatterRegistry>,
    settings: DisplaySettings,
    byte_order: ByteOrder,
    dynamic_resolver: Option<Arc<dyn DynamicTypeResolver>>,
    stop_id: AtomicU64,
    running: AtomicBool,
}

impl fmt::Debug for Target
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Target")
            .field("memory", &self.memory().describe())
            .field("catalog", &self.catalog)
            .field("stop_id", &self.stop_id())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Target
{
    /// A stopped target with default settings.
    #[must_use]
    pub fn new(memory: Arc<dyn MemorySource>, catalog: Arc<TypeCatalog>, registry: Arc<FormatterRegistry>) -> Self
    {
        Self {
            memory: RwLock::new(memory),
            catalog,
            registry,
            settings: DisplaySettings::default(),
            byte_order: ByteOrder::default(),
            dynamic_resolver: None,
            stop_id: AtomicU64::new(1),
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: DisplaySettings) -> Self
    {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self
    {
        self.byte_order = byte_order;
        self
    }

    #[must_use]
    pub fn with_dynamic_resolver(mut self, resolver: Arc<dyn DynamicTypeResolver>) -> Self
    {
        self.dynamic_resolver = Some(resolver);
        self
    }

    pub fn memory(&self) -> Arc<dyn MemorySource>
    {
        self.memory.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog>
    {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<FormatterRegistry>
    {
        &self.registry
    }

    pub fn settings(&self) -> &DisplaySettings
    {
        &self.settings
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        self.byte_order
    }

    pub(crate) fn dynamic_resolver(&self) -> Option<&Arc<dyn DynamicTypeResolver>>
    {
        self.dynamic_resolver.as_ref()
    }

    pub fn stop_id(&self) -> StopId
    {
        StopId(self.stop_id.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool
    {
        self.running.load(Ordering::Acquire)
    }

    fn advance(&self) -> StopId
    {
        StopId(self.stop_id.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The target was resumed or stepped. All cached display state is now stale
    /// and memory reads fail with [`ReadError::TargetRunning`] until
    /// [`Self::notify_stopped`].
    pub fn notify_resumed(&self)
    {
        self.running.store(true, Ordering::Release);
        let stop_id = self.advance();
        info!(%stop_id, "target resumed");
    }

    /// The target stopped again.
    pub fn notify_stopped(&self)
    {
        self.running.store(false, Ordering::Release);
        let stop_id = self.advance();
        info!(%stop_id, "target stopped");
    }

    /// Swap the memory source (a new snapshot of the same process). Counts
    /// as a new stop.
    pub fn replace_memory(&self, memory: Arc<dyn MemorySource>)
    {
        *self.memory.write().unwrap_or_else(PoisonError::into_inner) = memory;
        let stop_id = self.advance();
        debug!(%stop_id, "memory source replaced");
    }

    /// Bounded read through the current memory source.
    ///
    /// ## Errors
    ///
    /// - `TargetRunning`: the target has been resumed
    /// - `Unreadable`: the memory source could not supply the range
    pub fn read_memory(&self, address: Address, size: usize) -> std::result::Result<Vec<u8>, ReadError>
    {
        if self.is_running() {
            return Err(ReadError::TargetRunning);
        }
        self.memory().read_bytes(address, size)
    }

    /// A root value of the named type at `address`.
    ///
    /// ## Errors
    ///
    /// Returns `UnknownType` if the catalog can't resolve `type_name`.
    pub fn value_at(self: &Arc<Self>, name: &str, address: Address, type_name: &str) -> Result<ValueHandle>
    {
        let ty = self.catalog.resolve(type_name)?;
        Ok(ValueHandle::at_address(self, name, address, ty))
    }

    /// A root value whose bytes are already known (register contents,
    /// expression results).
    ///
    /// ## Errors
    ///
    /// Returns `UnknownType` if the catalog can't resolve `type_name`.
    pub fn value_from_bytes(self: &Arc<Self>, name: &str, bytes: &[u8], type_name: &str) -> Result<ValueHandle>
    {
        let ty = self.catalog.resolve(type_name)?;
        Ok(ValueHandle::from_bytes(self, name, bytes, ty))
    }
}
