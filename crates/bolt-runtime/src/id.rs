use core::sync::atomic::{AtomicU64, Ordering};

static HANDLE_COUNT: AtomicU64 = AtomicU64::new(0);

/// Identifies one device allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    value: u64,
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleId {
    /// Creates a new unique id.
    pub fn new() -> Self {
        let value = HANDLE_COUNT.fetch_add(1, Ordering::Relaxed);
        Self { value }
    }
}

impl core::fmt::Display for HandleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "handle#{}", self.value)
    }
}

/// Kernel identifier, made of the kernel type name and optional launch information.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KernelId {
    name: &'static str,
    info: Option<String>,
}

impl KernelId {
    /// Create a kernel id from the kernel type.
    ///
    /// The type may borrow data, it doesn't need to be `'static`.
    pub fn new<T: ?Sized>() -> Self {
        Self {
            name: core::any::type_name::<T>(),
            info: None,
        }
    }

    /// Attach extra information that distinguishes two kernels of the same type,
    /// such as the tile width.
    pub fn info<I: core::fmt::Display>(mut self, info: I) -> Self {
        self.info = Some(info.to_string());
        self
    }

    /// Short name of the kernel, without module path or generics.
    pub fn name(&self) -> &str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl core::fmt::Display for KernelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{}({info})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}
