//! Marks possibly-uninitialized stack allocations symbolic.
//!
//! Downstream symbolic-execution backends treat an uninitialized read as
//! undefined behavior; this pass rewrites every stack slot that is not
//! provably overwritten in its own block so the slot holds an unconstrained
//! input instead. No hard analysis: an alloc counts as initialized only when
//! a later instruction in the same block overwrites the whole slot. A DFS
//! over the CFG could prove more slots initialized, but over all allocs it
//! would cost O(n^2), and the extra instrumentation is harmless to later
//! cleanup passes.

use tracing::{debug, trace};

use crate::ir::{
    BinOp, Block, ConstValue, Function, GlobalId, InstKind, Instruction, Module, Operand,
    TypeCache, TypeId, TypeKind, ValueDef,
};
use crate::pass::Pass;

/// External helper every instrumentation site calls:
/// `klee_make_symbolic(addr: ptr u8, nbytes: size, name: ptr u8)`.
pub const SYMBOLIC_FN: &str = "klee_make_symbolic";

/// Diagnostic name passed to every annotation call.
pub const SYMBOLIC_NAME: &str = "nondet";

/// Module global holding [`SYMBOLIC_NAME`].
const NAME_GLOBAL: &str = "nondet.str";

/// Functions with these prefixes belong to the verification harness or were
/// already instrumented by other tooling; they are never touched.
pub const SKIP_PREFIXES: [&str; 2] = ["__VERIFIER_", "__INSTR_"];

/// Gives every possibly-uninitialized stack allocation a non-deterministic
/// value before its first use.
pub struct NondetInit;

impl Pass for NondetInit {
    fn name(&self) -> &'static str {
        "nondet-init"
    }

    fn description(&self) -> &'static str {
        "initialize possibly-uninitialized stack slots with non-deterministic values"
    }

    fn run_on_function(&mut self, module: &mut Module, func: usize) -> bool {
        run_on_function(module, func)
    }
}

/// Module-scoped pieces shared by every instrumentation site.
struct SymbolicDecls {
    size_ty: TypeId,
    byte_ptr: TypeId,
    name: GlobalId,
}

impl SymbolicDecls {
    /// Get-or-create the annotation declaration, the size type matching the
    /// target pointer width, and the diagnostic name constant. Idempotent:
    /// the module's by-name semantics reuse existing entries.
    fn resolve(module: &mut Module) -> Self {
        let unit = module.types.unit();
        let byte = module.types.int(false, 8);
        let byte_ptr = module.types.ptr(byte);
        let size_bits = if module.layout.pointer_bits() > 32 { 64 } else { 32 };
        let size_ty = module.types.int(false, size_bits);
        let name = module.global_string(NAME_GLOBAL, SYMBOLIC_NAME);
        module.declare_function(SYMBOLIC_FN, vec![byte_ptr, size_ty, byte_ptr], unit);
        Self {
            size_ty,
            byte_ptr,
            name,
        }
    }
}

/// The three instrumentation shapes, keyed off the allocation's type.
enum AllocShape {
    Array,
    Dynamic(Operand),
    Scalar,
}

fn classify(types: &TypeCache, ty: TypeId, count: &Option<Operand>) -> AllocShape {
    if matches!(types.kind(ty), TypeKind::Array { .. }) {
        AllocShape::Array
    } else if let Some(count) = count {
        AllocShape::Dynamic(*count)
    } else {
        AllocShape::Scalar
    }
}

/// An alloc counts as initialized only when a later instruction in its own
/// block stores a value of exactly the allocated type to exactly its
/// address. Partial stores, stores through derived pointers, and stores in
/// other blocks never qualify; unsized slots are always flagged.
fn may_be_uninitialized(func: &Function, types: &TypeCache, block: &Block, index: usize) -> bool {
    let inst = &block.insts[index];
    let (alloc_ty, addr) = match (&inst.kind, &inst.result) {
        (InstKind::Alloc { ty, .. }, Some(def)) => (*ty, def.id),
        _ => return true,
    };

    if !types.is_sized(alloc_ty) {
        return true;
    }

    for inst in &block.insts[index + 1..] {
        if let InstKind::Store { ptr, value } = &inst.kind {
            // the whole slot is overwritten with the declared type
            if *ptr == addr && func.operand_type(value) == alloc_ty {
                return false;
            }
        }
    }

    true
}

fn is_excluded(name: &str) -> bool {
    SKIP_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn run_on_function(module: &mut Module, func: usize) -> bool {
    if is_excluded(&module.funcs[func].name) {
        debug!(func = %module.funcs[func].name, "skipping reserved function");
        return false;
    }

    let decls = SymbolicDecls::resolve(module);

    // Collect flagged allocs up front; the splices below would invalidate a
    // live scan.
    let mut worklist = Vec::new();
    let target = &module.funcs[func];
    for (block_index, block) in target.blocks.iter().enumerate() {
        for (inst_index, inst) in block.insts.iter().enumerate() {
            let InstKind::Alloc { ty, .. } = &inst.kind else {
                continue;
            };
            if !may_be_uninitialized(target, &module.types, block, inst_index) {
                continue;
            }
            // unsized slots are a defined skip, not an error
            if !module.types.is_sized(*ty) {
                continue;
            }
            worklist.push((block_index, inst_index));
        }
    }

    if worklist.is_empty() {
        return false;
    }

    // Later positions first, so earlier indices survive the splices.
    for &(block_index, inst_index) in worklist.iter().rev() {
        instrument(module, func, block_index, inst_index, &decls);
    }

    debug!(
        func = %module.funcs[func].name,
        sites = worklist.len(),
        "marked allocations symbolic"
    );
    true
}

fn instrument(
    module: &mut Module,
    func: usize,
    block_index: usize,
    inst_index: usize,
    decls: &SymbolicDecls,
) {
    let (alloc_ty, addr, addr_ty, count) = {
        let inst = &module.funcs[func].blocks[block_index].insts[inst_index];
        let (InstKind::Alloc { ty, count }, Some(def)) = (&inst.kind, &inst.result) else {
            unreachable!("worklist entry is not an alloc");
        };
        (*ty, def.id, def.ty, *count)
    };

    let shape = classify(&module.types, alloc_ty, &count);
    let size = module.types.layout(&module.layout, alloc_ty).size();
    let name_addr = Operand::Const(module.global_addr(decls.name));
    let target = &mut module.funcs[func];

    let insts = match shape {
        // Storing a whole symbolic array would be prohibitively expensive;
        // annotate the existing memory in place instead.
        AllocShape::Array => {
            let cast = target.new_value(decls.byte_ptr);
            vec![
                Instruction {
                    result: Some(ValueDef {
                        id: cast,
                        ty: decls.byte_ptr,
                    }),
                    kind: InstKind::PtrCast {
                        value: addr,
                        ty: decls.byte_ptr,
                    },
                },
                call_symbolic(
                    Operand::Value(cast),
                    Operand::Const(ConstValue::int(decls.size_ty, size as i128)),
                    name_addr,
                ),
            ]
        }
        // Byte size is only known at runtime: count times the element size.
        AllocShape::Dynamic(count) => {
            let cast = target.new_value(decls.byte_ptr);
            let total = target.new_value(decls.size_ty);
            vec![
                Instruction {
                    result: Some(ValueDef {
                        id: cast,
                        ty: decls.byte_ptr,
                    }),
                    kind: InstKind::PtrCast {
                        value: addr,
                        ty: decls.byte_ptr,
                    },
                },
                Instruction {
                    result: Some(ValueDef {
                        id: total,
                        ty: decls.size_ty,
                    }),
                    kind: InstKind::BinOp {
                        op: BinOp::Mul,
                        lhs: count,
                        rhs: Operand::Const(ConstValue::int(decls.size_ty, size as i128)),
                    },
                },
                call_symbolic(Operand::Value(cast), Operand::Value(total), name_addr),
            ]
        }
        // Mark a fresh shadow slot symbolic and copy it over with a normal
        // store; the original slot stays eligible for dead-store elimination
        // if the program initializes it later on.
        AllocShape::Scalar => {
            let shadow = target.new_value(addr_ty);
            let cast = target.new_value(decls.byte_ptr);
            let loaded = target.new_value(alloc_ty);
            vec![
                Instruction {
                    result: Some(ValueDef {
                        id: shadow,
                        ty: addr_ty,
                    }),
                    kind: InstKind::Alloc {
                        ty: alloc_ty,
                        count: None,
                    },
                },
                Instruction {
                    result: Some(ValueDef {
                        id: cast,
                        ty: decls.byte_ptr,
                    }),
                    kind: InstKind::PtrCast {
                        value: shadow,
                        ty: decls.byte_ptr,
                    },
                },
                call_symbolic(
                    Operand::Value(cast),
                    Operand::Const(ConstValue::int(decls.size_ty, size as i128)),
                    name_addr,
                ),
                Instruction {
                    result: Some(ValueDef {
                        id: loaded,
                        ty: alloc_ty,
                    }),
                    kind: InstKind::Load { ptr: shadow },
                },
                Instruction {
                    result: None,
                    kind: InstKind::Store {
                        ptr: addr,
                        value: Operand::Value(loaded),
                    },
                },
            ]
        }
    };

    target.blocks[block_index].splice_after(inst_index, insts);
    trace!(block = block_index, index = inst_index, "inserted symbolic marking");
}

fn call_symbolic(addr: Operand, size: Operand, name: Operand) -> Instruction {
    Instruction {
        result: None,
        kind: InstKind::Call {
            callee: SYMBOLIC_FN.to_string(),
            args: vec![addr, size, name],
        },
    }
}

#[cfg(test)]
#[path = "../tests/pass/t_nondet_init.rs"]
mod tests;
