//! Function transform passes.

use crate::ir::Module;

pub mod nondet_init;

pub use nondet_init::NondetInit;

/// A per-function transform identified by a stable name.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Processes one function of `module`; returns whether it modified it.
    fn run_on_function(&mut self, module: &mut Module, func: usize) -> bool;
}

pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Runs every registered pass over every function of the module.
    pub fn run(&mut self, module: &mut Module) -> bool {
        let mut changed = false;
        for pass in &mut self.passes {
            for func in 0..module.funcs.len() {
                changed |= pass.run_on_function(module, func);
            }
        }
        changed
    }
}
