use crate::front::ast::{Block, BlockItem, Expr, LVal, Span, Stmt};
use crate::front::ir::expr_ir::{build_array_ptr, is_const_lval, validate_array_indices};
use crate::front::ir::GenerateIR;
use crate::front::ir::IrContext;
use crate::ir::BasicBlock;
use crate::CompilerError;

// 当前块未终结时补一条跳转
fn jump_to_if_needed(ctx: &mut IrContext, target: BasicBlock) -> Result<(), CompilerError> {
    let bb = ctx.get_current_bb()?;
    if !ctx.has_terminator(bb)? {
        let jump_inst = ctx.dfg_mut()?.new_value().jump(target);
        ctx.push_inst(jump_inst)?;
    }
    Ok(())
}

pub fn generate_return_stmt_ir(
    expr: &Option<Expr>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let ret_val = match expr {
        Some(e) => Some(e.generate_ir(ctx)?),
        None => None,
    };
    let ret_inst = ctx.dfg_mut()?.new_value().ret(ret_val);
    ctx.push_inst(ret_inst)?;
    Ok(())
}

pub fn generate_assign_stmt_ir(
    lval: &LVal,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let expr_val = expr.generate_ir(ctx)?;

    let stored_val = ctx
        .lookup_var(&lval.name)
        .ok_or_else(|| ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span))?;

    if !lval.indices.is_empty() {
        // 数组元素赋值：多级 getelemptr 后 store
        let is_array_param = validate_array_indices(lval, stored_val, ctx)?;
        if ctx.const_arrays.contains(&stored_val) {
            return Err(ctx.error_at_span(
                format!("Cannot assign to constant array `{}`", lval.name),
                lval.span,
            ));
        }
        let ptr = build_array_ptr(lval, stored_val, ctx, is_array_param)?;
        let store_inst = ctx.dfg_mut()?.new_value().store(expr_val, ptr);
        ctx.push_inst(store_inst)?;
        Ok(())
    } else {
        // 标量赋值
        if is_const_lval(lval, stored_val, ctx)? {
            return Err(ctx.error_at_span(
                format!("Cannot assign to constant `{}`", lval.name),
                lval.span,
            ));
        }
        // stored_val 是 Alloc 或 GlobalAlloc
        let store_inst = ctx.dfg_mut()?.new_value().store(expr_val, stored_val);
        ctx.push_inst(store_inst)?;
        Ok(())
    }
}

pub fn generate_block_stmt_ir(block: &Block, ctx: &mut IrContext) -> Result<(), CompilerError> {
    ctx.push_scope();

    for item in block {
        let bb = ctx.get_current_bb()?;
        if ctx.has_terminator(bb)? {
            break;
        }
        match item {
            BlockItem::Decl(decl) => decl.generate_ir(ctx)?,
            BlockItem::Stmt(stmt) => {
                stmt.generate_ir(ctx)?;
                let bb = ctx.get_current_bb()?;
                if ctx.has_terminator(bb)? {
                    break;
                }
            }
        }
    }

    ctx.pop_scope()?;
    Ok(())
}

pub fn generate_expr_stmt_ir(expr: &Option<Expr>, ctx: &mut IrContext) -> Result<(), CompilerError> {
    if let Some(e) = expr {
        e.generate_ir(ctx)?;
    }
    Ok(())
}

/// if 语句：分支块在填充内容时才挂入布局，
/// 因此文本中的块顺序是 then、else、end。
pub fn generate_if_stmt_ir(
    cond: &Expr,
    then_stmt: &Stmt,
    else_stmt: Option<&Stmt>,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let cond_val = cond.generate_ir(ctx)?;

    let then_bb = ctx.new_bb("then")?;
    let else_bb = if else_stmt.is_some() {
        Some(ctx.new_bb("else")?)
    } else {
        None
    };
    let end_bb = ctx.new_bb("end")?;

    let br_inst = ctx
        .dfg_mut()?
        .new_value()
        .branch(cond_val, then_bb, else_bb.unwrap_or(end_bb));
    ctx.push_inst(br_inst)?;

    ctx.enter_bb(then_bb)?;
    then_stmt.generate_ir(ctx)?;
    jump_to_if_needed(ctx, end_bb)?;

    if let Some(else_s) = else_stmt {
        ctx.enter_bb(else_bb.unwrap())?;
        else_s.generate_ir(ctx)?;
        jump_to_if_needed(ctx, end_bb)?;
    }

    ctx.enter_bb(end_bb)?;
    Ok(())
}

/// while 语句：cond、body、end 三个块，
/// break/continue 的目标通过循环栈传递。
pub fn generate_while_stmt_ir(
    cond: &Expr,
    body: &Stmt,
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    let while_entry_bb = ctx.new_bb("while_entry")?;
    let while_body_bb = ctx.new_bb("while_body")?;
    let while_end_bb = ctx.new_bb("while_end")?;

    let j_to_entry = ctx.dfg_mut()?.new_value().jump(while_entry_bb);
    ctx.push_inst(j_to_entry)?;

    // 条件块：计算 cond，br 到 body 或 end
    ctx.enter_bb(while_entry_bb)?;
    let cond_val = cond.generate_ir(ctx)?;
    let br_inst = ctx
        .dfg_mut()?
        .new_value()
        .branch(cond_val, while_body_bb, while_end_bb);
    ctx.push_inst(br_inst)?;

    // 循环体：continue 跳条件块，break 跳结束块
    ctx.enter_bb(while_body_bb)?;
    ctx.loop_stack.push((while_entry_bb, while_end_bb));
    body.generate_ir(ctx)?;
    ctx.loop_stack.pop();
    jump_to_if_needed(ctx, while_entry_bb)?;

    ctx.enter_bb(while_end_bb)?;
    Ok(())
}

pub fn generate_break_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let (_, break_target) = *ctx
        .loop_stack
        .last()
        .ok_or_else(|| ctx.error_at_span("break used outside of loop", *span))?;

    let jump_inst = ctx.dfg_mut()?.new_value().jump(break_target);
    ctx.push_inst(jump_inst)?;
    Ok(())
}

pub fn generate_continue_stmt_ir(span: &Span, ctx: &mut IrContext) -> Result<(), CompilerError> {
    let (continue_target, _) = *ctx
        .loop_stack
        .last()
        .ok_or_else(|| ctx.error_at_span("continue used outside of loop", *span))?;

    let jump_inst = ctx.dfg_mut()?.new_value().jump(continue_target);
    ctx.push_inst(jump_inst)?;
    Ok(())
}
