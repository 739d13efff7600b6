use crate::front::ast::*;
use crate::front::ir::IrContext;
use crate::front::ir::{
    create_one_integer, create_zero_integer, generate_neq_zero, is_addressable, is_const_integer,
    GenerateIR,
};
use crate::ir::{BinaryOp as IrBinaryOp, Type, TypeKind, Value, ValueKind};
use crate::CompilerError;

// 在全局作用域中尝试常量折叠；函数内交给构建器处理
fn try_const_fold_binary_op<F>(lhs: &Expr, ctx: &IrContext, create_expr: F) -> Option<i32>
where
    F: FnOnce(Span) -> Expr,
{
    if ctx.current_func.is_none() {
        let span = get_expr_span(lhs);
        let expr = create_expr(span);
        if let Ok(val) = evaluate_const_expr(&expr, ctx) {
            return Some(val);
        }
    }
    None
}

// 生成 load 指令
fn generate_load_instruction(stored_val: Value, ctx: &mut IrContext) -> Result<Value, CompilerError> {
    let load_inst = ctx.dfg_mut()?.new_value().load(stored_val);
    ctx.push_inst(load_inst)?;
    Ok(load_inst)
}

fn collect_param_types(ctx: &IrContext, func: crate::ir::Function) -> Vec<Type> {
    ctx.program
        .func(func)
        .ty()
        .param_types()
        .unwrap_or(&[])
        .to_vec()
}

fn validate_call_arg_types(
    arg_values: &[Value],
    param_tys: &[Type],
    ctx: &IrContext,
    span: Span,
) -> Result<(), CompilerError> {
    if arg_values.len() != param_tys.len() {
        return Err(ctx.error_at_span(
            format!(
                "Call argument count mismatch: expected {}, got {}",
                param_tys.len(),
                arg_values.len()
            ),
            span,
        ));
    }
    for (i, arg_val) in arg_values.iter().enumerate() {
        let expected = &param_tys[i];
        let actual = ctx.value_ty(*arg_val)?;
        if &actual != expected {
            return Err(ctx.error_at_span(
                format!(
                    "Call argument type mismatch at {}: expected {}, got {}",
                    i, expected, actual
                ),
                span,
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_array_indices(
    lval: &LVal,
    stored_val: Value,
    ctx: &IrContext,
) -> Result<bool, CompilerError> {
    let is_array_param = ctx.array_param_dims.contains_key(&lval.name);
    let param_dims = ctx.array_param_dims.get(&lval.name).copied().unwrap_or(0);
    if is_array_param {
        if lval.indices.len() > param_dims {
            return Err(ctx.error_at_span("Too many indices for array parameter", lval.span));
        }
        if lval.indices.len() < param_dims {
            return Err(ctx.error_at_span(
                "Partial array access is only allowed in function arguments",
                lval.span,
            ));
        }
        return Ok(true);
    }
    if let Some(total_dims) = get_array_dim_count(stored_val, ctx) {
        if lval.indices.len() > total_dims {
            return Err(ctx.error_at_span("Too many indices for array", lval.span));
        }
        if lval.indices.len() < total_dims {
            return Err(ctx.error_at_span(
                "Partial array access is only allowed in function arguments",
                lval.span,
            ));
        }
        return Ok(false);
    }
    Err(ctx.error_at_span("Indexed access on non-array variable", lval.span))
}

/// 构造数组元素地址。数组形参先 load 出衰退指针，第一维用 getptr，
/// 其余维度逐级 getelemptr。
pub(crate) fn build_array_ptr(
    lval: &LVal,
    stored_val: Value,
    ctx: &mut IrContext,
    is_array_param: bool,
) -> Result<Value, CompilerError> {
    let mut ptr = if is_array_param {
        let base_ptr = ctx.dfg_mut()?.new_value().load(stored_val);
        ctx.push_inst(base_ptr)?;
        base_ptr
    } else {
        stored_val
    };
    for (i, index_expr) in lval.indices.iter().enumerate() {
        let index_val = index_expr.generate_ir(ctx)?;
        let next_ptr = {
            let dfg = ctx.dfg_mut()?;
            if is_array_param && i == 0 {
                dfg.new_value().get_ptr(ptr, index_val)
            } else {
                dfg.new_value().get_elem_ptr(ptr, index_val)
            }
        };
        ctx.push_inst(next_ptr)?;
        ptr = next_ptr;
    }
    Ok(ptr)
}

pub(crate) fn is_const_lval(
    lval: &LVal,
    stored_val: Value,
    ctx: &IrContext,
) -> Result<bool, CompilerError> {
    let is_from_local_scope = ctx.scopes.iter().any(|scope| {
        scope
            .1
            .get(&lval.name)
            .map(|&val| val == stored_val)
            .unwrap_or(false)
    });
    if is_from_local_scope {
        return Ok(is_const_integer(stored_val, ctx));
    }
    Ok(ctx.global_constants.contains(&lval.name))
}

// 部分下标的数组访问只在实参位置合法，结果是衰退后的指针
fn try_build_array_arg_ptr(
    lval: &LVal,
    stored_val: Value,
    ctx: &mut IrContext,
) -> Result<Option<Value>, CompilerError> {
    if let Some(total_dims) = ctx.array_param_dims.get(&lval.name).copied() {
        if lval.indices.len() > total_dims {
            return Err(ctx.error_at_span("Too many indices for array parameter", lval.span));
        }
        if lval.indices.len() < total_dims {
            let ptr = build_array_ptr(lval, stored_val, ctx, true)?;
            return Ok(Some(ptr));
        }
        return Ok(None);
    }
    if let Some(total_dims) = get_array_dim_count(stored_val, ctx) {
        if lval.indices.len() > total_dims {
            return Err(ctx.error_at_span("Too many indices for array", lval.span));
        }
        if lval.indices.len() < total_dims {
            let ptr = build_array_ptr(lval, stored_val, ctx, false)?;
            return Ok(Some(ptr));
        }
        return Ok(None);
    }
    Ok(None)
}

// 形参期待元素指针而实参是数组指针时做一次衰退（getelemptr ptr, 0）
fn coerce_arg_to_expected(
    val: Value,
    expected_ty: &Option<Type>,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    let expected = match expected_ty {
        Some(ty) => ty,
        None => return Ok(val),
    };
    let actual = ctx.value_ty(val)?;
    if &actual == expected {
        return Ok(val);
    }
    if let (TypeKind::Pointer(actual_base), TypeKind::Pointer(expected_base)) =
        (actual.kind(), expected.kind())
    {
        if let TypeKind::Array(elem_ty, _) = actual_base.kind() {
            if expected_base == elem_ty {
                let zero = ctx.dfg_mut()?.new_value().integer(0);
                let next_ptr = ctx.dfg_mut()?.new_value().get_elem_ptr(val, zero);
                ctx.push_inst(next_ptr)?;
                return Ok(next_ptr);
            }
        }
    }
    Ok(val)
}

fn count_array_dims_from_base(base: &Type) -> Option<usize> {
    match base.kind() {
        TypeKind::Array(elem, _) => {
            let sub = count_array_dims_from_base(elem).unwrap_or(0);
            Some(1 + sub)
        }
        _ => None,
    }
}

pub(crate) fn get_array_dim_count(stored_val: Value, ctx: &IrContext) -> Option<usize> {
    let ty = ctx.value_ty(stored_val).ok()?;
    match ty.kind() {
        TypeKind::Pointer(base) => count_array_dims_from_base(base),
        _ => None,
    }
}

/// 常量全局数组的下标读取：沿下标链走初始化器。
/// 任意一级遇到 zeroinit 即为 0；下标不是常量时返回 None，退回运行时访问。
pub(crate) fn fold_const_array_read(
    lval: &LVal,
    stored_val: Value,
    ctx: &IrContext,
) -> Result<Option<i32>, CompilerError> {
    if !ctx.global_constants.contains(&lval.name) {
        return Ok(None);
    }
    let init = match ctx.program.try_borrow_value(stored_val).map(|d| d.kind().clone()) {
        Some(ValueKind::GlobalAlloc(global)) => global.init(),
        _ => return Ok(None),
    };
    let mut indices = Vec::with_capacity(lval.indices.len());
    for expr in &lval.indices {
        match evaluate_const_expr(expr, ctx) {
            Ok(val) => indices.push(val),
            Err(_) => return Ok(None),
        }
    }
    let mut cur = init;
    for idx in indices {
        let kind = ctx.program.borrow_value(cur).kind().clone();
        match kind {
            ValueKind::Aggregate(agg) => match agg.elems().get(idx as usize) {
                Some(&elem) => cur = elem,
                None => return Ok(None),
            },
            ValueKind::ZeroInit => return Ok(Some(0)),
            _ => return Ok(None),
        }
    }
    match ctx.program.borrow_value(cur).kind() {
        ValueKind::Integer(i) => Ok(Some(i.value())),
        ValueKind::ZeroInit => Ok(Some(0)),
        _ => Ok(None),
    }
}

// 主函数：生成左值读取（r-value）IR
pub fn generate_lval_ir(lval: &LVal, ctx: &mut IrContext) -> Result<Value, CompilerError> {
    let stored_val = ctx
        .lookup_var(&lval.name)
        .ok_or_else(|| ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span))?;

    if !lval.indices.is_empty() {
        // 数组元素访问；常量数组且下标全为常量时直接折叠
        let is_array_param = validate_array_indices(lval, stored_val, ctx)?;
        if !is_array_param {
            if let Some(val) = fold_const_array_read(lval, stored_val, ctx)? {
                return Ok(ctx.dfg_mut()?.new_value().integer(val));
            }
        }
        let ptr = build_array_ptr(lval, stored_val, ctx, is_array_param)?;
        generate_load_instruction(ptr, ctx)
    } else {
        if ctx.array_param_dims.contains_key(&lval.name) {
            return Err(ctx.error_at_span("Array parameter used as scalar", lval.span));
        }
        if ctx.current_func.is_some() {
            if let Some(val) = ctx.value_int(stored_val) {
                // 常量：在函数内重建整型字面量
                return Ok(ctx.dfg_mut()?.new_value().integer(val));
            }
            if is_addressable(stored_val, ctx)? {
                return generate_load_instruction(stored_val, ctx);
            }
            Err(ctx.error_at_span(
                format!("Variable `{}` is not readable here", lval.name),
                lval.span,
            ))
        } else {
            // 全局作用域：只能引用常量
            match ctx.value_int(stored_val) {
                Some(_) => Ok(stored_val),
                None => Err(ctx.error_at_span(
                    format!("Variable `{}` is not a constant", lval.name),
                    lval.span,
                )),
            }
        }
    }
}

/// 常量表达式求值，返回编译期整数。
/// 运算语义与运行时一致：32 位补码回绕，除零/模零得 0。
pub fn evaluate_const_expr(expr: &Expr, ctx: &IrContext) -> Result<i32, CompilerError> {
    match expr {
        Expr::IntLiteral(n, _) => Ok(*n),
        Expr::UnaryOp(op, sub_expr, _) => {
            let val = evaluate_const_expr(sub_expr, ctx)?;
            match op {
                UnaryOp::Plus => Ok(val),
                UnaryOp::Minus => Ok(val.wrapping_neg()),
                UnaryOp::Not => Ok(if val == 0 { 1 } else { 0 }),
            }
        }
        Expr::BinaryOp(op, lhs, rhs, _) => {
            let lval = evaluate_const_expr(lhs, ctx)?;
            let rval = evaluate_const_expr(rhs, ctx)?;
            let ir_op = match op {
                BinaryOp::Add => IrBinaryOp::Add,
                BinaryOp::Sub => IrBinaryOp::Sub,
                BinaryOp::Mul => IrBinaryOp::Mul,
                BinaryOp::Div => IrBinaryOp::Div,
                BinaryOp::Mod => IrBinaryOp::Mod,
            };
            Ok(ir_op.eval(lval, rval))
        }
        Expr::LVal(lval) => {
            let stored_val = ctx.lookup_var(&lval.name).ok_or_else(|| {
                CompilerError::IRGenerationError(format!(
                    "Variable `{}` not found in constant expression",
                    lval.name
                ))
            })?;
            if !lval.indices.is_empty() {
                // 常量全局数组的下标读取可以折叠
                if let Some(val) = fold_const_array_read(lval, stored_val, ctx)? {
                    return Ok(val);
                }
                return Err(ctx.error_at_span(
                    format!("`{}` is not a constant array element", lval.name),
                    lval.span,
                ));
            }
            match ctx.value_int(stored_val) {
                Some(val) => Ok(val),
                None => Err(ctx.error_at_span(
                    format!("Variable `{}` is not a constant", lval.name),
                    lval.span,
                )),
            }
        }
        Expr::RelOp(op, lhs, rhs, _) => {
            let lval = evaluate_const_expr(lhs, ctx)?;
            let rval = evaluate_const_expr(rhs, ctx)?;
            let result = match op {
                RelOp::Lt => lval < rval,
                RelOp::Gt => lval > rval,
                RelOp::Le => lval <= rval,
                RelOp::Ge => lval >= rval,
            };
            Ok(if result { 1 } else { 0 })
        }
        Expr::EqOp(op, lhs, rhs, _) => {
            let lval = evaluate_const_expr(lhs, ctx)?;
            let rval = evaluate_const_expr(rhs, ctx)?;
            let result = match op {
                EqOp::Eq => lval == rval,
                EqOp::Ne => lval != rval,
            };
            Ok(if result { 1 } else { 0 })
        }
        Expr::LAndOp(_, lhs, rhs, _) => {
            let lval = evaluate_const_expr(lhs, ctx)?;
            if lval == 0 {
                Ok(0)
            } else {
                let rval = evaluate_const_expr(rhs, ctx)?;
                Ok(if rval != 0 { 1 } else { 0 })
            }
        }
        Expr::LOrOp(_, lhs, rhs, _) => {
            let lval = evaluate_const_expr(lhs, ctx)?;
            if lval != 0 {
                Ok(1)
            } else {
                let rval = evaluate_const_expr(rhs, ctx)?;
                Ok(if rval != 0 { 1 } else { 0 })
            }
        }
        Expr::Call(_, _, span) => Err(ctx.error_at_span(
            "Function calls are not allowed in constant expressions",
            *span,
        )),
    }
}

// 从表达式中提取 span
fn get_expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::IntLiteral(_, span) => *span,
        Expr::LVal(lval) => lval.span,
        Expr::UnaryOp(_, _, span) => *span,
        Expr::BinaryOp(_, _, _, span) => *span,
        Expr::RelOp(_, _, _, span) => *span,
        Expr::EqOp(_, _, _, span) => *span,
        Expr::LAndOp(_, _, _, span) => *span,
        Expr::LOrOp(_, _, _, span) => *span,
        Expr::Call(_, _, span) => *span,
    }
}

pub fn generate_unary_op_ir(
    op: &UnaryOp,
    expr: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    // 全局作用域中必须折叠为常量
    if ctx.current_func.is_none() {
        let span = get_expr_span(expr);
        let whole = Expr::UnaryOp(*op, Box::new(expr.clone()), span);
        let val = evaluate_const_expr(&whole, ctx)?;
        return Ok(ctx.program.new_value().integer(val));
    }

    let operand_val = expr.generate_ir(ctx)?;
    match op {
        UnaryOp::Plus => Ok(operand_val),
        UnaryOp::Minus => {
            let zero = create_zero_integer(ctx)?;
            ctx.emit_binary(IrBinaryOp::Sub, zero, operand_val)
        }
        UnaryOp::Not => {
            let zero = create_zero_integer(ctx)?;
            ctx.emit_binary(IrBinaryOp::Eq, operand_val, zero)
        }
    }
}

pub fn generate_binary_op_ir(
    op: &BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    if let Some(val) = try_const_fold_binary_op(lhs, ctx, |span| {
        Expr::BinaryOp(*op, Box::new(lhs.clone()), Box::new(rhs.clone()), span)
    }) {
        return Ok(ctx.program.new_value().integer(val));
    }

    let lval = lhs.generate_ir(ctx)?;
    let rval = rhs.generate_ir(ctx)?;
    let bop = match op {
        BinaryOp::Add => IrBinaryOp::Add,
        BinaryOp::Sub => IrBinaryOp::Sub,
        BinaryOp::Mul => IrBinaryOp::Mul,
        BinaryOp::Div => IrBinaryOp::Div,
        BinaryOp::Mod => IrBinaryOp::Mod,
    };
    ctx.emit_binary(bop, lval, rval)
}

pub fn generate_rel_op_ir(
    op: &RelOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    if let Some(val) = try_const_fold_binary_op(lhs, ctx, |span| {
        Expr::RelOp(*op, Box::new(lhs.clone()), Box::new(rhs.clone()), span)
    }) {
        return Ok(ctx.program.new_value().integer(val));
    }

    let lval = lhs.generate_ir(ctx)?;
    let rval = rhs.generate_ir(ctx)?;
    let bop = match op {
        RelOp::Lt => IrBinaryOp::Lt,
        RelOp::Gt => IrBinaryOp::Gt,
        RelOp::Le => IrBinaryOp::Le,
        RelOp::Ge => IrBinaryOp::Ge,
    };
    ctx.emit_binary(bop, lval, rval)
}

pub fn generate_eq_op_ir(
    op: &EqOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    if let Some(val) = try_const_fold_binary_op(lhs, ctx, |span| {
        Expr::EqOp(*op, Box::new(lhs.clone()), Box::new(rhs.clone()), span)
    }) {
        return Ok(ctx.program.new_value().integer(val));
    }

    let lval = lhs.generate_ir(ctx)?;
    let rval = rhs.generate_ir(ctx)?;
    let bop = match op {
        EqOp::Eq => IrBinaryOp::Eq,
        EqOp::Ne => IrBinaryOp::NotEq,
    };
    ctx.emit_binary(bop, lval, rval)
}

/// 逻辑与短路求值，结果经由汇合块的块参数传递：
///
/// ```text
///   br lhs, %land_rhs, %land_end(0)
/// %land_rhs:
///   %b = ne rhs, 0
///   jump %land_end(%b)
/// %land_end(%result: i32):
/// ```
pub fn generate_land_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    let lhs_val = lhs.generate_ir(ctx)?;

    let rhs_bb = ctx.new_bb("land_rhs")?;
    let end_bb = ctx.new_bb_with_params("land_end", vec![Type::get_i32()])?;

    // lhs 为假时结果已定为 0
    let zero = create_zero_integer(ctx)?;
    let br_inst = ctx
        .dfg_mut()?
        .new_value()
        .branch_with_args(lhs_val, rhs_bb, end_bb, vec![], vec![zero]);
    ctx.push_inst(br_inst)?;

    ctx.enter_bb(rhs_bb)?;
    let rhs_val = rhs.generate_ir(ctx)?;
    let ne_val = generate_neq_zero(rhs_val, ctx)?;
    let j_end = ctx.dfg_mut()?.new_value().jump_with_args(end_bb, vec![ne_val]);
    ctx.push_inst(j_end)?;

    ctx.enter_bb(end_bb)?;
    ctx.bb_param(end_bb, 0)
}

/// 逻辑或短路求值，与 `&&` 对称：lhs 为真时结果已定为 1
pub fn generate_lor_op_ir(
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    let lhs_val = lhs.generate_ir(ctx)?;

    let rhs_bb = ctx.new_bb("lor_rhs")?;
    let end_bb = ctx.new_bb_with_params("lor_end", vec![Type::get_i32()])?;

    let one = create_one_integer(ctx)?;
    let br_inst = ctx
        .dfg_mut()?
        .new_value()
        .branch_with_args(lhs_val, end_bb, rhs_bb, vec![one], vec![]);
    ctx.push_inst(br_inst)?;

    ctx.enter_bb(rhs_bb)?;
    let rhs_val = rhs.generate_ir(ctx)?;
    let ne_val = generate_neq_zero(rhs_val, ctx)?;
    let j_end = ctx.dfg_mut()?.new_value().jump_with_args(end_bb, vec![ne_val]);
    ctx.push_inst(j_end)?;

    ctx.enter_bb(end_bb)?;
    ctx.bb_param(end_bb, 0)
}

pub fn generate_call_ir(
    func_name: &String,
    args: &Vec<Expr>,
    span: Span,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    let func_handle = ctx
        .func_table
        .get(func_name)
        .copied()
        .ok_or_else(|| ctx.error_at_span(format!("Function `{}` not found", func_name), span))?;
    let param_tys = collect_param_types(ctx, func_handle);

    // 生成所有实参的 IR；数组实参做衰退处理
    let mut arg_values = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        let expected_ty = param_tys.get(idx).cloned();
        if let Expr::LVal(lval) = arg {
            let stored_val = ctx.lookup_var(&lval.name).ok_or_else(|| {
                ctx.error_at_span(format!("Variable `{}` not found", lval.name), lval.span)
            })?;
            if let Some(ptr) = try_build_array_arg_ptr(lval, stored_val, ctx)? {
                let coerced = coerce_arg_to_expected(ptr, &expected_ty, ctx)?;
                arg_values.push(coerced);
                continue;
            }
        }
        let val = arg.generate_ir(ctx)?;
        let coerced = coerce_arg_to_expected(val, &expected_ty, ctx)?;
        arg_values.push(coerced);
    }

    validate_call_arg_types(&arg_values, &param_tys, ctx, span)?;
    let ret_ty = ctx.program.func(func_handle).ret_ty().clone();
    let call_inst = ctx
        .dfg_mut()?
        .new_value()
        .call(func_handle, arg_values, ret_ty);
    ctx.push_inst(call_inst)?;

    Ok(call_inst)
}
