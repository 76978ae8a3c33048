use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use nondet_init::ir::format::format_module;
use nondet_init::ir::{
    ConstValue, DataLayout, FunctionBuilder, Module, Operand, Terminator, TypeKind,
};
use nondet_init::pass::{NondetInit, PassManager};
use nondet_init::verify::verify_module;

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated list of things to dump: before,after
    #[clap(long)]
    dump: Option<String>,

    /// Pointer width of the target, in bits
    #[clap(long, default_value_t = 64)]
    pointer_bits: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut dump_before = false;
    let mut dump_after = true;
    if let Some(dump) = &args.dump {
        dump_after = false;
        for item in dump.split(',').map(|s| s.trim().to_lowercase()) {
            match item.as_str() {
                "before" => dump_before = true,
                "after" => dump_after = true,
                "" => {}
                _ => {
                    eprintln!("[WARN] unknown dump flag: {item}");
                }
            }
        }
    }

    let mut module = build_demo_module(DataLayout::new(args.pointer_bits));

    if dump_before {
        println!("IR (before):");
        println!("--------------------------------");
        print!("{}", format_module(&module));
        println!("--------------------------------");
    }

    let mut manager = PassManager::new();
    manager.register(Box::new(NondetInit));
    let changed = manager.run(&mut module);

    if dump_after {
        println!("IR (after):");
        println!("--------------------------------");
        print!("{}", format_module(&module));
        println!("--------------------------------");
    }

    match verify_module(&module) {
        Ok(()) => {
            if changed {
                println!("[SUCCESS] module instrumented and verified");
            } else {
                println!("[SUCCESS] module verified; nothing to instrument");
            }
        }
        Err(error) => {
            println!("[ERROR] verification failed: {error}");
            std::process::exit(1);
        }
    }
}

/// A small module exercising every instrumentation shape: an uninitialized
/// scalar, a fixed array, a runtime-sized buffer, an initialized slot that
/// is left alone, and a harness function the pass must skip.
fn build_demo_module(layout: DataLayout) -> Module {
    let mut module = Module::new("demo", layout);
    let u8_ty = module.types.int(false, 8);
    let u32_ty = module.types.int(false, 32);
    let arr_ty = module.types.array(u32_ty, 8);
    let unit_ty = module.types.unit();
    let bool_ty = module.types.intern(TypeKind::Bool);
    // element counts are size-typed on the target
    let count_bits = if layout.pointer_bits() > 32 { 64 } else { 32 };
    let count_ty = module.types.int(false, count_bits);

    let mut builder = FunctionBuilder::new(&mut module.types, "main", vec![count_ty], u32_ty);
    let entry = builder.add_block();
    let len = builder.param(0);
    let x = builder.alloc(entry, u32_ty);
    let _buf = builder.alloc(entry, arr_ty);
    let _bytes = builder.alloc_dynamic(entry, u8_ty, Operand::Value(len));
    let y = builder.alloc(entry, u32_ty);
    builder.store(entry, y, Operand::Const(ConstValue::int(u32_ty, 7)));
    let value = builder.load(entry, x);
    builder.set_terminator(
        entry,
        Terminator::Ret {
            value: Some(Operand::Value(value)),
        },
    );
    module.funcs.push(builder.finish());

    let mut builder = FunctionBuilder::new(
        &mut module.types,
        "__VERIFIER_assert",
        vec![bool_ty],
        unit_ty,
    );
    let entry = builder.add_block();
    let _cond_slot = builder.alloc(entry, u32_ty);
    builder.set_terminator(entry, Terminator::Ret { value: None });
    module.funcs.push(builder.finish());

    module
}
