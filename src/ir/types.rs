use std::collections::HashMap;

use crate::ir::layout::{DataLayout, Layout, LayoutCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Unit,
    Bool,
    Int {
        signed: bool,
        bits: u8,
    },
    Ptr {
        elem: TypeId,
    },
    Array {
        elem: TypeId,
        len: u64,
    },
    Struct {
        fields: Vec<TypeId>,
    },
    /// Forward-declared type with unknown contents; the only unsized kind.
    Opaque {
        name: String,
    },
}

/// Interns type definitions so that id equality coincides with structural
/// type equality.
#[derive(Debug, Default, Clone)]
pub struct TypeCache {
    types: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    layout_cache: LayoutCache,
}

impl TypeCache {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            interned: HashMap::new(),
            layout_cache: LayoutCache::new(),
        }
    }

    /// Returns the id for `kind`, adding it to the table on first use.
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.interned.get(&kind) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()]
    }

    pub fn unit(&mut self) -> TypeId {
        self.intern(TypeKind::Unit)
    }

    pub fn int(&mut self, signed: bool, bits: u8) -> TypeId {
        self.intern(TypeKind::Int { signed, bits })
    }

    pub fn ptr(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Ptr { elem })
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(TypeKind::Array { elem, len })
    }

    /// Whether values of this type have a statically known byte size.
    pub fn is_sized(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Opaque { .. } => false,
            TypeKind::Array { elem, .. } => self.is_sized(*elem),
            TypeKind::Struct { fields } => fields.iter().all(|field| self.is_sized(*field)),
            _ => true,
        }
    }

    /// Returns layout information for a sized type, computing it on demand.
    pub fn layout(&mut self, data_layout: &DataLayout, id: TypeId) -> Layout {
        self.layout_cache.layout(&self.types, data_layout, id)
    }
}
