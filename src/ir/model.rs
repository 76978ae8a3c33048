//! Explicit-memory IR data model.
//!
//! Functions are the unit of processing, blocks the unit of control flow,
//! instructions the unit of computation. Values are register-like ids with
//! types recorded in a per-function table; memory is reached through `Alloc`
//! results and written with `Store`. The module owns the type table, the
//! target layout description, and name-keyed globals and external function
//! declarations.

use indexmap::IndexMap;

use crate::ir::layout::DataLayout;
use crate::ir::types::{TypeCache, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

impl ValueId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

impl GlobalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueDef {
    pub id: ValueId,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstKind {
    Int(i128),
    Bool(bool),
    GlobalAddr(GlobalId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstValue {
    pub ty: TypeId,
    pub kind: ConstKind,
}

impl ConstValue {
    pub fn int(ty: TypeId, value: i128) -> Self {
        Self {
            ty,
            kind: ConstKind::Int(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(ValueId),
    Const(ConstValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub result: Option<ValueDef>,
    pub kind: InstKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    /// Reserves stack space for a value of `ty`. A `count` operand makes
    /// this a runtime-sized allocation of `count` elements of `ty`. The
    /// result is the slot's address, of type `ptr ty`.
    Alloc {
        ty: TypeId,
        count: Option<Operand>,
    },
    Load {
        ptr: ValueId,
    },
    Store {
        ptr: ValueId,
        value: Operand,
    },
    /// Reinterprets a pointer value at another pointer type.
    PtrCast {
        value: ValueId,
        ty: TypeId,
    },
    BinOp {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// Call by symbol name; the callee resolves against the module's
    /// declarations (or another function of the module).
    Call {
        callee: String,
        args: Vec<Operand>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Ret {
        value: Option<Operand>,
    },
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Operand,
        then_bb: BlockId,
        else_bb: BlockId,
    },
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub insts: Vec<Instruction>,
    pub term: Terminator,
}

impl Block {
    /// Splices `insts` into the block immediately after `index`, preserving
    /// their order. Positions before and at `index` are unaffected.
    pub fn splice_after(&mut self, index: usize, insts: Vec<Instruction>) {
        debug_assert!(!insts.is_empty());
        debug_assert!(index < self.insts.len());
        self.insts.splice(index + 1..index + 1, insts);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub sig: FunctionSig,
    pub blocks: Vec<Block>,
    /// Value types indexed by `ValueId`; parameters occupy the first slots.
    values: Vec<TypeId>,
}

impl Function {
    pub fn new(name: impl Into<String>, sig: FunctionSig) -> Self {
        let values = sig.params.clone();
        Self {
            name: name.into(),
            sig,
            blocks: Vec::new(),
            values,
        }
    }

    pub fn param(&self, index: usize) -> ValueId {
        debug_assert!(index < self.sig.params.len());
        ValueId(index as u32)
    }

    pub fn new_value(&mut self, ty: TypeId) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ty);
        id
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn value_type(&self, id: ValueId) -> TypeId {
        self.values[id.index()]
    }

    pub fn operand_type(&self, operand: &Operand) -> TypeId {
        match operand {
            Operand::Value(id) => self.value_type(*id),
            Operand::Const(value) => value.ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub ty: TypeId,
    pub bytes: Vec<u8>,
    pub constant: bool,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub types: TypeCache,
    pub layout: DataLayout,
    pub globals: IndexMap<String, Global>,
    pub decls: IndexMap<String, FuncDecl>,
    pub funcs: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>, layout: DataLayout) -> Self {
        Self {
            name: name.into(),
            types: TypeCache::new(),
            layout,
            globals: IndexMap::new(),
            decls: IndexMap::new(),
            funcs: Vec::new(),
        }
    }

    /// Get-or-create a private constant byte-string global, keyed by name.
    pub fn global_string(&mut self, name: &str, value: &str) -> GlobalId {
        if let Some(index) = self.globals.get_index_of(name) {
            return GlobalId(index as u32);
        }
        let byte = self.types.int(false, 8);
        let ty = self.types.array(byte, value.len() as u64);
        let (index, _) = self.globals.insert_full(
            name.to_string(),
            Global {
                ty,
                bytes: value.as_bytes().to_vec(),
                constant: true,
                private: true,
            },
        );
        GlobalId(index as u32)
    }

    pub fn global(&self, id: GlobalId) -> (&str, &Global) {
        let (name, global) = self
            .globals
            .get_index(id.index())
            .unwrap_or_else(|| panic!("invalid global id {:?}", id));
        (name.as_str(), global)
    }

    /// The address of a global, as a constant. Global addresses decay to the
    /// generic byte-pointer type.
    pub fn global_addr(&mut self, id: GlobalId) -> ConstValue {
        let byte = self.types.int(false, 8);
        let byte_ptr = self.types.ptr(byte);
        ConstValue {
            ty: byte_ptr,
            kind: ConstKind::GlobalAddr(id),
        }
    }

    /// Get-or-insert an external function declaration; idempotent by name.
    pub fn declare_function(&mut self, name: &str, params: Vec<TypeId>, ret: TypeId) {
        self.decls
            .entry(name.to_string())
            .or_insert(FuncDecl { params, ret });
    }
}
