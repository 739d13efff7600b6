use crate::front::{ast::*, ir::*};
use crate::ir::Program;
use crate::utils::SourceMap;
use crate::CompilerError;

pub mod ast;
pub mod ir;

pub fn generate_ir(ast: &CompUnit, source_map: Option<SourceMap>) -> Result<Program, CompilerError> {
    let mut ctx = IrContext::new(source_map);
    ast.generate_ir(&mut ctx)?;
    Ok(ctx.program)
}
