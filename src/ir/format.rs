//! Textual rendering of modules and functions, used by dumps and tests.

use std::fmt::Write;

use crate::ir::model::{
    BinOp, ConstKind, ConstValue, Function, InstKind, Instruction, Module, Operand, Terminator,
};
use crate::ir::types::{TypeCache, TypeId, TypeKind};

pub fn format_type(types: &TypeCache, ty: TypeId) -> String {
    match types.kind(ty) {
        TypeKind::Unit => "()".to_string(),
        TypeKind::Bool => "bool".to_string(),
        TypeKind::Int { signed, bits } => {
            let prefix = if *signed { "i" } else { "u" };
            format!("{}{}", prefix, bits)
        }
        TypeKind::Ptr { elem } => format!("ptr {}", format_type(types, *elem)),
        TypeKind::Array { elem, len } => format!("{}[{}]", format_type(types, *elem), len),
        TypeKind::Struct { fields } => {
            let fields = fields
                .iter()
                .map(|field| format_type(types, *field))
                .collect::<Vec<_>>();
            format!("{{ {} }}", fields.join(", "))
        }
        TypeKind::Opaque { name } => name.clone(),
    }
}

pub fn format_module(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "module {} (ptr {})",
        module.name,
        module.layout.pointer_bits()
    );

    if !module.globals.is_empty() {
        let _ = writeln!(out);
        for (name, global) in &module.globals {
            let _ = writeln!(
                out,
                "global @{} = \"{}\"",
                name,
                String::from_utf8_lossy(&global.bytes)
            );
        }
    }

    if !module.decls.is_empty() {
        let _ = writeln!(out);
        for (name, decl) in &module.decls {
            let params = decl
                .params
                .iter()
                .map(|param| format_type(&module.types, *param))
                .collect::<Vec<_>>();
            let _ = writeln!(
                out,
                "declare @{}({}) -> {}",
                name,
                params.join(", "),
                format_type(&module.types, decl.ret)
            );
        }
    }

    for func in &module.funcs {
        let _ = writeln!(out);
        out.push_str(&format_func(module, func));
    }
    out
}

pub fn format_func(module: &Module, func: &Function) -> String {
    let types = &module.types;
    let mut out = String::new();

    let params = (0..func.sig.params.len())
        .map(|index| {
            let param = func.param(index);
            format!(
                "%v{}: {}",
                param.0,
                format_type(types, func.value_type(param))
            )
        })
        .collect::<Vec<_>>();
    let _ = writeln!(
        out,
        "fn {}({}) -> {} {{",
        func.name,
        params.join(", "),
        format_type(types, func.sig.ret)
    );

    for (index, block) in func.blocks.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "  bb{}:", block.id.0);
        for inst in &block.insts {
            let _ = writeln!(out, "    {}", format_inst(module, inst));
        }
        let _ = writeln!(out, "    {}", format_terminator(module, &block.term));
    }
    let _ = writeln!(out, "}}");
    out
}

fn format_const(module: &Module, value: &ConstValue) -> String {
    match &value.kind {
        ConstKind::Int(int) => format!("{}:{}", int, format_type(&module.types, value.ty)),
        ConstKind::Bool(b) => format!("{}:bool", b),
        ConstKind::GlobalAddr(id) => format!("@{}", module.global(*id).0),
    }
}

fn format_operand(module: &Module, operand: &Operand) -> String {
    match operand {
        Operand::Value(id) => format!("%v{}", id.0),
        Operand::Const(value) => format_const(module, value),
    }
}

fn format_binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::Div => "div",
    }
}

fn format_inst(module: &Module, inst: &Instruction) -> String {
    let types = &module.types;
    let lhs = match &inst.result {
        Some(def) => format!("%v{}: {} = ", def.id.0, format_type(types, def.ty)),
        None => String::new(),
    };

    let rhs = match &inst.kind {
        InstKind::Alloc { ty, count } => match count {
            Some(count) => format!(
                "alloc {}, count {}",
                format_type(types, *ty),
                format_operand(module, count)
            ),
            None => format!("alloc {}", format_type(types, *ty)),
        },
        InstKind::Load { ptr } => format!("load %v{}", ptr.0),
        InstKind::Store { ptr, value } => {
            format!("store {} -> %v{}", format_operand(module, value), ptr.0)
        }
        InstKind::PtrCast { value, .. } => format!("cast %v{}", value.0),
        InstKind::BinOp { op, lhs, rhs } => format!(
            "{} {}, {}",
            format_binop(*op),
            format_operand(module, lhs),
            format_operand(module, rhs)
        ),
        InstKind::Call { callee, args } => {
            let args = args
                .iter()
                .map(|arg| format_operand(module, arg))
                .collect::<Vec<_>>();
            format!("call @{}({})", callee, args.join(", "))
        }
    };

    format!("{}{}", lhs, rhs)
}

fn format_terminator(module: &Module, term: &Terminator) -> String {
    match term {
        Terminator::Ret { value } => match value {
            Some(value) => format!("ret {}", format_operand(module, value)),
            None => "ret".to_string(),
        },
        Terminator::Br { target } => format!("br bb{}", target.0),
        Terminator::CondBr {
            cond,
            then_bb,
            else_bb,
        } => format!(
            "condbr {}, bb{}, bb{}",
            format_operand(module, cond),
            then_bb.0,
            else_bb.0
        ),
        Terminator::Unreachable => "unreachable".to_string(),
    }
}
