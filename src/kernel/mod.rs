//! Variant-to-kernel registry.

use crate::noise::NoiseVariant;

/// Pairs a variant with its compiled kernel, if one was supplied.
#[derive(Debug, Clone)]
pub struct KernelBinding<K> {
    pub variant: NoiseVariant,
    pub kernel: Option<K>,
}

impl<K> KernelBinding<K> {
    pub fn new(variant: NoiseVariant, kernel: K) -> Self {
        Self {
            variant,
            kernel: Some(kernel),
        }
    }

    /// An entry that names a variant but carries no kernel.
    pub fn unbound(variant: NoiseVariant) -> Self {
        Self {
            variant,
            kernel: None,
        }
    }
}

/// Ordered list of kernel bindings.
///
/// Lookup scans in registration order and returns the first binding for a
/// variant; later duplicates are never consulted.
#[derive(Debug, Clone)]
pub struct KernelRegistry<K> {
    bindings: Vec<KernelBinding<K>>,
}

impl<K> Default for KernelRegistry<K> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<K> KernelRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: Vec<KernelBinding<K>>) -> Self {
        Self { bindings }
    }

    /// Appends a binding.
    pub fn register(&mut self, binding: KernelBinding<K>) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// First binding whose variant matches.
    pub fn find(&self, variant: NoiseVariant) -> Option<&KernelBinding<K>> {
        self.bindings.iter().find(|b| b.variant == variant)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
