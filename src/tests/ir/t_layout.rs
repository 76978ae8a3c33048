use crate::ir::layout::DataLayout;
use crate::ir::types::{TypeCache, TypeKind};

#[test]
fn test_layout_ints() {
    let mut types = TypeCache::new();
    let layout = DataLayout::new(64);

    let u8_ty = types.int(false, 8);
    let u32_ty = types.int(false, 32);
    let i64_ty = types.int(true, 64);

    assert_eq!(types.layout(&layout, u8_ty).size(), 1);
    assert_eq!(types.layout(&layout, u32_ty).size(), 4);
    assert_eq!(types.layout(&layout, u32_ty).align(), 4);
    assert_eq!(types.layout(&layout, i64_ty).size(), 8);
    assert_eq!(types.layout(&layout, i64_ty).align(), 8);
}

#[test]
fn test_layout_pointer_follows_data_layout() {
    let mut types = TypeCache::new();
    let u8_ty = types.int(false, 8);
    let ptr_ty = types.ptr(u8_ty);

    assert_eq!(types.layout(&DataLayout::new(64), ptr_ty).size(), 8);

    // fresh cache; layouts are cached per type id
    let mut types = TypeCache::new();
    let u8_ty = types.int(false, 8);
    let ptr_ty = types.ptr(u8_ty);
    assert_eq!(types.layout(&DataLayout::new(32), ptr_ty).size(), 4);
}

#[test]
fn test_layout_array_stride() {
    let mut types = TypeCache::new();
    let layout = DataLayout::new(64);
    let u64_ty = types.int(false, 64);
    let array_ty = types.array(u64_ty, 3);

    let array_layout = types.layout(&layout, array_ty);
    assert_eq!(array_layout.size(), 24);
    assert_eq!(array_layout.align(), 8);
}

#[test]
fn test_layout_struct_padding() {
    let mut types = TypeCache::new();
    let layout = DataLayout::new(64);
    let u8_ty = types.int(false, 8);
    let u16_ty = types.int(false, 16);
    let u64_ty = types.int(false, 64);
    let struct_ty = types.intern(TypeKind::Struct {
        fields: vec![u8_ty, u64_ty, u16_ty],
    });

    let struct_layout = types.layout(&layout, struct_ty);
    assert_eq!(struct_layout.size(), 24);
    assert_eq!(struct_layout.align(), 8);
}

#[test]
fn test_sizedness() {
    let mut types = TypeCache::new();
    let u32_ty = types.int(false, 32);
    let opaque_ty = types.intern(TypeKind::Opaque {
        name: "handle".to_string(),
    });
    let opaque_array = types.array(opaque_ty, 4);
    let holder = types.intern(TypeKind::Struct {
        fields: vec![u32_ty, opaque_ty],
    });

    assert!(types.is_sized(u32_ty));
    assert!(!types.is_sized(opaque_ty));
    assert!(!types.is_sized(opaque_array));
    assert!(!types.is_sized(holder));
}

#[test]
fn test_interning_dedups() {
    let mut types = TypeCache::new();
    let a = types.int(false, 32);
    let b = types.int(false, 32);
    assert_eq!(a, b);

    let arr_a = types.array(a, 10);
    let arr_b = types.array(b, 10);
    assert_eq!(arr_a, arr_b);

    let other = types.int(true, 32);
    assert_ne!(a, other);
}
