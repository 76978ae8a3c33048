//! Minimal function builder.
//!
//! Provides a small API for creating IR functions for tests and front ends
//! without exposing the raw id allocation details.

use crate::ir::model::{
    BinOp, Block, BlockId, Function, FunctionSig, InstKind, Instruction, Operand, Terminator,
    ValueDef, ValueId,
};
use crate::ir::types::{TypeCache, TypeId, TypeKind};

/// Constructs functions while managing value and block id allocation.
pub struct FunctionBuilder<'a> {
    types: &'a mut TypeCache,
    func: Function,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(
        types: &'a mut TypeCache,
        name: impl Into<String>,
        params: Vec<TypeId>,
        ret: TypeId,
    ) -> Self {
        Self {
            types,
            func: Function::new(name, FunctionSig { params, ret }),
        }
    }

    pub fn param(&self, index: usize) -> ValueId {
        self.func.param(index)
    }

    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(Block {
            id,
            insts: Vec::new(),
            term: Terminator::Unreachable,
        });
        id
    }

    pub fn alloc(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        self.alloc_inst(block, ty, None)
    }

    /// Runtime-sized allocation of `count` elements of `ty`.
    pub fn alloc_dynamic(&mut self, block: BlockId, ty: TypeId, count: Operand) -> ValueId {
        self.alloc_inst(block, ty, Some(count))
    }

    fn alloc_inst(&mut self, block: BlockId, ty: TypeId, count: Option<Operand>) -> ValueId {
        let ptr_ty = self.types.ptr(ty);
        let result = self.func.new_value(ptr_ty);
        self.push(
            block,
            Instruction {
                result: Some(ValueDef {
                    id: result,
                    ty: ptr_ty,
                }),
                kind: InstKind::Alloc { ty, count },
            },
        );
        result
    }

    pub fn load(&mut self, block: BlockId, ptr: ValueId) -> ValueId {
        let elem = match self.types.kind(self.func.value_type(ptr)) {
            TypeKind::Ptr { elem } => *elem,
            other => panic!("load through non-pointer value: {:?}", other),
        };
        let result = self.func.new_value(elem);
        self.push(
            block,
            Instruction {
                result: Some(ValueDef {
                    id: result,
                    ty: elem,
                }),
                kind: InstKind::Load { ptr },
            },
        );
        result
    }

    pub fn store(&mut self, block: BlockId, ptr: ValueId, value: Operand) {
        self.push(
            block,
            Instruction {
                result: None,
                kind: InstKind::Store { ptr, value },
            },
        );
    }

    pub fn ptr_cast(&mut self, block: BlockId, value: ValueId, ty: TypeId) -> ValueId {
        debug_assert!(matches!(self.types.kind(ty), TypeKind::Ptr { .. }));
        let result = self.func.new_value(ty);
        self.push(
            block,
            Instruction {
                result: Some(ValueDef { id: result, ty }),
                kind: InstKind::PtrCast { value, ty },
            },
        );
        result
    }

    pub fn binop(
        &mut self,
        block: BlockId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
        ty: TypeId,
    ) -> ValueId {
        debug_assert_eq!(self.func.operand_type(&lhs), ty);
        debug_assert_eq!(self.func.operand_type(&rhs), ty);
        let result = self.func.new_value(ty);
        self.push(
            block,
            Instruction {
                result: Some(ValueDef { id: result, ty }),
                kind: InstKind::BinOp { op, lhs, rhs },
            },
        );
        result
    }

    /// Emits a call; unit-returning calls produce no value.
    pub fn call(
        &mut self,
        block: BlockId,
        callee: impl Into<String>,
        args: Vec<Operand>,
        ret: TypeId,
    ) -> Option<ValueId> {
        let result = if matches!(self.types.kind(ret), TypeKind::Unit) {
            None
        } else {
            let id = self.func.new_value(ret);
            Some(ValueDef { id, ty: ret })
        };
        self.push(
            block,
            Instruction {
                result,
                kind: InstKind::Call {
                    callee: callee.into(),
                    args,
                },
            },
        );
        result.map(|def| def.id)
    }

    pub fn set_terminator(&mut self, block: BlockId, term: Terminator) {
        self.block_mut(block).term = term;
    }

    pub fn finish(self) -> Function {
        self.func
    }

    fn push(&mut self, block: BlockId, inst: Instruction) {
        self.block_mut(block).insts.push(inst);
    }

    fn block_mut(&mut self, block: BlockId) -> &mut Block {
        let index = block.index();
        self.func
            .blocks
            .get_mut(index)
            .unwrap_or_else(|| panic!("invalid block id {:?}", block))
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_builder.rs"]
mod tests;
