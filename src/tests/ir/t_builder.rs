use crate::ir::format::format_func;
use crate::ir::{
    BinOp, ConstValue, DataLayout, FunctionBuilder, InstKind, Module, Operand, Terminator,
    TypeKind,
};

#[test]
fn test_build_function() {
    let mut module = Module::new("test", DataLayout::new(64));
    let u32_ty = module.types.int(false, 32);
    let ptr_u32 = module.types.ptr(u32_ty);

    let mut builder = FunctionBuilder::new(&mut module.types, "sum", vec![u32_ty], u32_ty);
    let entry = builder.add_block();
    let arg = builder.param(0);
    let slot = builder.alloc(entry, u32_ty);
    builder.store(entry, slot, Operand::Value(arg));
    let loaded = builder.load(entry, slot);
    let doubled = builder.binop(
        entry,
        BinOp::Add,
        Operand::Value(loaded),
        Operand::Value(loaded),
        u32_ty,
    );
    builder.set_terminator(
        entry,
        Terminator::Ret {
            value: Some(Operand::Value(doubled)),
        },
    );
    let func = builder.finish();

    assert_eq!(func.blocks.len(), 1);
    assert_eq!(func.blocks[0].insts.len(), 4);
    assert_eq!(func.value_type(slot), ptr_u32);
    assert_eq!(func.value_type(loaded), u32_ty);
    assert_eq!(func.value_type(doubled), u32_ty);

    module.funcs.push(func);
    let text = format_func(&module, &module.funcs[0]);
    assert!(text.contains("fn sum(%v0: u32) -> u32 {"));
    assert!(text.contains("alloc u32"));
    assert!(text.contains("ret %v3"));
}

#[test]
fn test_dynamic_alloc_records_count() {
    let mut module = Module::new("test", DataLayout::new(64));
    let u8_ty = module.types.int(false, 8);
    let u64_ty = module.types.int(false, 64);
    let unit_ty = module.types.unit();

    let mut builder = FunctionBuilder::new(&mut module.types, "f", vec![u64_ty], unit_ty);
    let entry = builder.add_block();
    let count = builder.param(0);
    let buf = builder.alloc_dynamic(entry, u8_ty, Operand::Value(count));
    builder.set_terminator(entry, Terminator::Ret { value: None });
    let func = builder.finish();

    let inst = &func.blocks[0].insts[0];
    assert_eq!(inst.result.map(|def| def.id), Some(buf));
    assert!(matches!(
        &inst.kind,
        InstKind::Alloc {
            count: Some(Operand::Value(id)),
            ..
        } if *id == count
    ));
}

#[test]
fn test_unit_call_has_no_result() {
    let mut module = Module::new("test", DataLayout::new(64));
    let u32_ty = module.types.int(false, 32);
    let unit_ty = module.types.unit();
    let bool_ty = module.types.intern(TypeKind::Bool);

    let mut builder = FunctionBuilder::new(&mut module.types, "f", vec![], unit_ty);
    let entry = builder.add_block();
    let none = builder.call(
        entry,
        "sink",
        vec![Operand::Const(ConstValue::int(u32_ty, 1))],
        unit_ty,
    );
    let some = builder.call(entry, "flip", vec![], bool_ty);
    builder.set_terminator(entry, Terminator::Ret { value: None });
    let func = builder.finish();

    assert!(none.is_none());
    let flipped = some.expect("non-unit call should produce a value");
    assert_eq!(func.value_type(flipped), bool_ty);
    assert!(func.blocks[0].insts[0].result.is_none());
}
