//! Structural well-formedness checks for IR modules.
//!
//! The transform passes assume validated input; this is the validation.

use thiserror::Error;

use crate::ir::{
    Block, BlockId, ConstKind, Function, InstKind, Instruction, Module, Operand, Terminator,
    TypeId, TypeKind, ValueId,
};

#[derive(Debug, Clone, Error)]
#[error("{func}: {message}")]
pub struct VerifyError {
    pub func: String,
    pub message: String,
}

fn err(func: &str, message: impl Into<String>) -> VerifyError {
    VerifyError {
        func: func.to_string(),
        message: message.into(),
    }
}

pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in &module.funcs {
        verify_function(module, func)?;
    }
    Ok(())
}

pub fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    let name = func.name.as_str();

    for (index, block) in func.blocks.iter().enumerate() {
        if block.id.index() != index {
            return Err(err(name, format!("block id {:?} out of order", block.id)));
        }
    }

    // First pass: every result id defined exactly once, with the type the
    // function's value table records for it.
    let mut defined = vec![false; func.value_count()];
    for slot in defined.iter_mut().take(func.sig.params.len()) {
        *slot = true;
    }
    for block in &func.blocks {
        for inst in &block.insts {
            let Some(result) = &inst.result else { continue };
            if result.id.index() >= func.value_count() {
                return Err(err(name, format!("result {:?} out of range", result.id)));
            }
            if func.value_type(result.id) != result.ty {
                return Err(err(
                    name,
                    format!("result {:?} disagrees with value table", result.id),
                ));
            }
            if defined[result.id.index()] {
                return Err(err(name, format!("duplicate definition of {:?}", result.id)));
            }
            defined[result.id.index()] = true;
        }
    }

    // Second pass: uses resolve, and instruction typing holds.
    for block in &func.blocks {
        for inst in &block.insts {
            for used in inst_uses(&inst.kind) {
                if used.index() >= func.value_count() || !defined[used.index()] {
                    return Err(err(name, format!("use of undefined value {:?}", used)));
                }
            }
            for operand in inst_operands(&inst.kind) {
                verify_operand(module, name, &operand)?;
            }
            verify_inst(module, func, name, inst)?;
        }
        for used in term_uses(&block.term) {
            if used.index() >= func.value_count() || !defined[used.index()] {
                return Err(err(name, format!("use of undefined value {:?}", used)));
            }
        }
        verify_terminator(module, func, name, block)?;
    }

    Ok(())
}

fn inst_uses(kind: &InstKind) -> Vec<ValueId> {
    fn push(uses: &mut Vec<ValueId>, operand: &Operand) {
        if let Operand::Value(id) = operand {
            uses.push(*id);
        }
    }

    let mut uses = Vec::new();
    match kind {
        InstKind::Alloc { count, .. } => {
            if let Some(count) = count {
                push(&mut uses, count);
            }
        }
        InstKind::Load { ptr } => uses.push(*ptr),
        InstKind::Store { ptr, value } => {
            uses.push(*ptr);
            push(&mut uses, value);
        }
        InstKind::PtrCast { value, .. } => uses.push(*value),
        InstKind::BinOp { lhs, rhs, .. } => {
            push(&mut uses, lhs);
            push(&mut uses, rhs);
        }
        InstKind::Call { args, .. } => {
            for arg in args {
                push(&mut uses, arg);
            }
        }
    }
    uses
}

fn term_uses(term: &Terminator) -> Vec<ValueId> {
    let operand = match term {
        Terminator::Ret { value } => value.as_ref(),
        Terminator::CondBr { cond, .. } => Some(cond),
        Terminator::Br { .. } | Terminator::Unreachable => None,
    };
    match operand {
        Some(Operand::Value(id)) => vec![*id],
        _ => Vec::new(),
    }
}

fn inst_operands(kind: &InstKind) -> Vec<Operand> {
    match kind {
        InstKind::Alloc { count, .. } => count.iter().copied().collect(),
        InstKind::Load { .. } | InstKind::PtrCast { .. } => Vec::new(),
        InstKind::Store { value, .. } => vec![*value],
        InstKind::BinOp { lhs, rhs, .. } => vec![*lhs, *rhs],
        InstKind::Call { args, .. } => args.clone(),
    }
}

fn verify_operand(module: &Module, func: &str, operand: &Operand) -> Result<(), VerifyError> {
    if let Operand::Const(value) = operand {
        match value.kind {
            ConstKind::Int(_) => {
                if !matches!(module.types.kind(value.ty), TypeKind::Int { .. }) {
                    return Err(err(func, "integer constant with non-integer type"));
                }
            }
            ConstKind::Bool(_) => {
                if !matches!(module.types.kind(value.ty), TypeKind::Bool) {
                    return Err(err(func, "bool constant with non-bool type"));
                }
            }
            ConstKind::GlobalAddr(id) => {
                if id.index() >= module.globals.len() {
                    return Err(err(func, format!("reference to unknown global {:?}", id)));
                }
                if !matches!(module.types.kind(value.ty), TypeKind::Ptr { .. }) {
                    return Err(err(func, "global address with non-pointer type"));
                }
            }
        }
    }
    Ok(())
}

fn pointee(module: &Module, ty: TypeId) -> Option<TypeId> {
    match module.types.kind(ty) {
        TypeKind::Ptr { elem } => Some(*elem),
        _ => None,
    }
}

fn verify_inst(
    module: &Module,
    func: &Function,
    name: &str,
    inst: &Instruction,
) -> Result<(), VerifyError> {
    match &inst.kind {
        InstKind::Alloc { ty, count } => {
            let result = inst
                .result
                .as_ref()
                .ok_or_else(|| err(name, "alloc without result"))?;
            if pointee(module, result.ty) != Some(*ty) {
                return Err(err(name, "alloc result is not a pointer to its type"));
            }
            if let Some(count) = count {
                let count_ty = func.operand_type(count);
                if !matches!(module.types.kind(count_ty), TypeKind::Int { .. }) {
                    return Err(err(name, "alloc count is not an integer"));
                }
            }
        }
        InstKind::Load { ptr } => {
            let result = inst
                .result
                .as_ref()
                .ok_or_else(|| err(name, "load without result"))?;
            match pointee(module, func.value_type(*ptr)) {
                Some(elem) if elem == result.ty => {}
                Some(_) => return Err(err(name, "load result type mismatch")),
                None => return Err(err(name, "load through non-pointer value")),
            }
        }
        InstKind::Store { ptr, value } => match pointee(module, func.value_type(*ptr)) {
            Some(elem) if elem == func.operand_type(value) => {}
            Some(_) => return Err(err(name, "store value type mismatch")),
            None => return Err(err(name, "store through non-pointer value")),
        },
        InstKind::PtrCast { value, ty } => {
            let result = inst
                .result
                .as_ref()
                .ok_or_else(|| err(name, "cast without result"))?;
            if result.ty != *ty {
                return Err(err(name, "cast result type mismatch"));
            }
            if pointee(module, *ty).is_none()
                || pointee(module, func.value_type(*value)).is_none()
            {
                return Err(err(name, "cast between non-pointer types"));
            }
        }
        InstKind::BinOp { lhs, rhs, .. } => {
            let result = inst
                .result
                .as_ref()
                .ok_or_else(|| err(name, "binop without result"))?;
            if func.operand_type(lhs) != result.ty || func.operand_type(rhs) != result.ty {
                return Err(err(name, "binop operand type mismatch"));
            }
            if !matches!(module.types.kind(result.ty), TypeKind::Int { .. }) {
                return Err(err(name, "binop on non-integer type"));
            }
        }
        InstKind::Call { callee, args } => {
            let (params, ret) = if let Some(decl) = module.decls.get(callee) {
                (decl.params.clone(), decl.ret)
            } else if let Some(target) = module.funcs.iter().find(|f| &f.name == callee) {
                (target.sig.params.clone(), target.sig.ret)
            } else {
                return Err(err(name, format!("call to undeclared function '{callee}'")));
            };
            if args.len() != params.len() {
                return Err(err(name, format!("call to '{callee}' with wrong arity")));
            }
            for (arg, param) in args.iter().zip(&params) {
                if func.operand_type(arg) != *param {
                    return Err(err(name, format!("call to '{callee}' with mismatched argument")));
                }
            }
            match &inst.result {
                Some(result) if result.ty != ret => {
                    return Err(err(name, format!("call to '{callee}' result type mismatch")));
                }
                None if !matches!(module.types.kind(ret), TypeKind::Unit) => {
                    return Err(err(name, format!("call to '{callee}' discards its result")));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn verify_terminator(
    module: &Module,
    func: &Function,
    name: &str,
    block: &Block,
) -> Result<(), VerifyError> {
    let in_range = |target: &BlockId| target.index() < func.blocks.len();
    match &block.term {
        Terminator::Ret { value } => match value {
            Some(value) => {
                if func.operand_type(value) != func.sig.ret {
                    return Err(err(name, "return value type mismatch"));
                }
            }
            None => {
                if !matches!(module.types.kind(func.sig.ret), TypeKind::Unit) {
                    return Err(err(name, "missing return value"));
                }
            }
        },
        Terminator::Br { target } => {
            if !in_range(target) {
                return Err(err(name, format!("branch to unknown block {:?}", target)));
            }
        }
        Terminator::CondBr {
            cond,
            then_bb,
            else_bb,
        } => {
            if !matches!(module.types.kind(func.operand_type(cond)), TypeKind::Bool) {
                return Err(err(name, "condbr condition is not a bool"));
            }
            if !in_range(then_bb) || !in_range(else_bb) {
                return Err(err(name, "condbr to unknown block"));
            }
        }
        Terminator::Unreachable => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/t_verify.rs"]
mod tests;
