pub mod context;
pub mod expr_ir;
pub mod stmt_ir;

use crate::front::ast::*;
use crate::front::ir::expr_ir::*;
use crate::front::ir::stmt_ir::*;
use crate::ir::{BinaryOp, FunctionData, Type, Value, ValueKind};
use crate::CompilerError;

pub use crate::front::ir::context::IrContext;

pub trait GenerateIR {
    type Output;
    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError>;
}

impl GenerateIR for CompUnit {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        // 预先声明所有 SysY 库函数
        declare_library_functions(ctx);

        for item in &self.items {
            match item {
                GlobalItem::Decl(decl) => {
                    decl.generate_ir(ctx)?;
                }
                GlobalItem::FuncDef(_) => {}
            }
        }

        // 预先声明所有用户函数（此时全局常量已可用于参数维度）
        for item in &self.items {
            if let GlobalItem::FuncDef(func) = item {
                if ctx.func_table.contains_key(&func.name) {
                    return Err(CompilerError::IRGenerationError(format!(
                        "Function `{}` already declared",
                        func.name
                    )));
                }
                let mut params = Vec::new();
                for param in &func.params {
                    let (param_ty, _) = build_param_type(param, ctx)?;
                    params.push((Some(format!("%{}", param.name)), param_ty));
                }
                let ret_ty = match func.ty {
                    DataType::Int => Type::get_i32(),
                    DataType::Void => Type::get_void(),
                };
                let func_name = format!("@{}", func.name);
                let func_data = FunctionData::with_param_names(func_name, params, ret_ty);
                let f = ctx.program.new_func(func_data);
                ctx.func_table.insert(func.name.clone(), f);
            }
        }

        for item in &self.items {
            if let GlobalItem::FuncDef(func) = item {
                func.generate_ir(ctx)?;
            }
        }
        Ok(())
    }
}

/// 声明所有 SysY 库函数
fn declare_library_functions(ctx: &mut IrContext) {
    let i32_ty = Type::get_i32();
    let void_ty = Type::get_void();
    let i32_ptr = Type::get_pointer(Type::get_i32());
    let decls: [(&str, Vec<Type>, Type); 8] = [
        ("getint", vec![], i32_ty.clone()),
        ("getch", vec![], i32_ty.clone()),
        ("getarray", vec![i32_ptr.clone()], i32_ty.clone()),
        ("putint", vec![i32_ty.clone()], void_ty.clone()),
        ("putch", vec![i32_ty.clone()], void_ty.clone()),
        ("putarray", vec![i32_ty, i32_ptr], void_ty.clone()),
        ("starttime", vec![], void_ty.clone()),
        ("stoptime", vec![], void_ty),
    ];
    for (name, param_tys, ret_ty) in decls {
        // 不添加基本块，使 is_decl() 为真，表示这是函数声明
        let func_data = FunctionData::new(format!("@{}", name), param_tys, ret_ty);
        let f = ctx.program.new_func(func_data);
        ctx.func_table.insert(name.to_string(), f);
    }
}

fn product_dims(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn build_array_type_from_dims(dims: &[usize]) -> Type {
    let mut ty = Type::get_i32();
    for dim in dims.iter().rev() {
        ty = Type::get_array(ty, *dim);
    }
    ty
}

pub(crate) fn build_param_type(
    param: &FuncFParam,
    ctx: &IrContext,
) -> Result<(Type, Option<Vec<usize>>), CompilerError> {
    if !param.is_array {
        return Ok((Type::get_i32(), None));
    }
    let mut dims = Vec::with_capacity(param.dims.len());
    for dim_expr in &param.dims {
        let dim = evaluate_const_expr(dim_expr, ctx)?;
        if dim < 0 {
            return Err(ctx.error_at_span("Array dimension must be non-negative", param.span));
        }
        dims.push(dim as usize);
    }
    let base_ty = if dims.is_empty() {
        Type::get_i32()
    } else {
        build_array_type_from_dims(&dims)
    };
    Ok((Type::get_pointer(base_ty), Some(dims)))
}

fn eval_array_dims(dims: &[Expr], span: Span, ctx: &IrContext) -> Result<Vec<usize>, CompilerError> {
    let mut result = Vec::with_capacity(dims.len());
    for dim_expr in dims {
        let dim = evaluate_const_expr(dim_expr, ctx)?;
        if dim < 0 {
            return Err(ctx.error_at_span("Array dimension must be non-negative", span));
        }
        result.push(dim as usize);
    }
    Ok(result)
}

fn pick_aligned_sub_dims<'a>(filled: usize, dims: &'a [usize]) -> Option<&'a [usize]> {
    // 从当前维度的下一级开始，选择“最大且对齐”的子数组维度
    // 这样多维数组初始化时，嵌套列表优先对齐到更高层的子数组
    for k in 1..dims.len() {
        let sub_size = product_dims(&dims[k..]);
        if filled % sub_size == 0 {
            return Some(&dims[k..]);
        }
    }
    None
}

fn eval_const_init_list(
    elems: &[ConstInitVal],
    dims: &[usize],
    ctx: &IrContext,
) -> Result<Vec<i32>, CompilerError> {
    if dims.is_empty() {
        return Err(CompilerError::IRGenerationError(
            "Braces around scalar initializer are not allowed".to_string(),
        ));
    }
    let total = product_dims(dims);
    let mut vals = Vec::with_capacity(total);
    let mut filled = 0;
    for elem in elems {
        if filled >= total {
            return Err(CompilerError::IRGenerationError(
                "Too many initializers for array".to_string(),
            ));
        }
        match elem {
            ConstInitVal::Single(expr) => {
                vals.push(evaluate_const_expr(expr, ctx)?);
                filled += 1;
            }
            ConstInitVal::List(list) => {
                let sub_dims = pick_aligned_sub_dims(filled, dims).ok_or_else(|| {
                    CompilerError::IRGenerationError(
                        "Initializer list is not aligned with array dimensions".to_string(),
                    )
                })?;
                let sub_size = product_dims(sub_dims);
                let mut sub_vals = eval_const_init_list(list, sub_dims, ctx)?;
                vals.append(&mut sub_vals);
                filled += sub_size;
            }
        }
    }
    while vals.len() < total {
        vals.push(0);
    }
    Ok(vals)
}

// 展平为定长向量；未填充的尾部元素为 None（存零）
fn eval_init_list(elems: &[InitVal], dims: &[usize]) -> Result<Vec<Option<Expr>>, CompilerError> {
    if dims.is_empty() {
        return Err(CompilerError::IRGenerationError(
            "Braces around scalar initializer are not allowed".to_string(),
        ));
    }
    let total = product_dims(dims);
    let mut vals = Vec::with_capacity(total);
    let mut filled = 0;
    for elem in elems {
        if filled >= total {
            return Err(CompilerError::IRGenerationError(
                "Too many initializers for array".to_string(),
            ));
        }
        match elem {
            InitVal::Single(expr) => {
                vals.push(Some(expr.clone()));
                filled += 1;
            }
            InitVal::List(list) => {
                let sub_dims = pick_aligned_sub_dims(filled, dims).ok_or_else(|| {
                    CompilerError::IRGenerationError(
                        "Initializer list is not aligned with array dimensions".to_string(),
                    )
                })?;
                let sub_size = product_dims(sub_dims);
                let mut sub_vals = eval_init_list(list, sub_dims)?;
                vals.append(&mut sub_vals);
                filled += sub_size;
            }
        }
    }
    while vals.len() < total {
        vals.push(None);
    }
    Ok(vals)
}

// 单表达式初始化数组时视为只有首元素的展平列表
fn flatten_const_init(
    init: &ConstInitVal,
    dims: &[usize],
    ctx: &IrContext,
) -> Result<Vec<i32>, CompilerError> {
    match init {
        ConstInitVal::Single(expr) => {
            let total = product_dims(dims);
            let mut vals = vec![evaluate_const_expr(expr, ctx)?];
            vals.resize(total, 0);
            Ok(vals)
        }
        ConstInitVal::List(elems) => eval_const_init_list(elems, dims, ctx),
    }
}

fn flatten_var_init(init: &InitVal, dims: &[usize]) -> Result<Vec<Option<Expr>>, CompilerError> {
    match init {
        InitVal::Single(expr) => {
            let total = product_dims(dims);
            let mut vals = vec![Some(expr.clone())];
            vals.resize(total, None);
            Ok(vals)
        }
        InitVal::List(elems) => eval_init_list(elems, dims),
    }
}

fn linear_to_indices(mut idx: usize, dims: &[usize]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(dims.len());
    for (i, _dim) in dims.iter().enumerate() {
        let stride = product_dims(&dims[i + 1..]);
        let div = if stride == 0 { 1 } else { stride };
        indices.push(idx / div);
        idx %= div;
    }
    indices
}

// 将展平的常量向量重建为与类型树匹配的嵌套 aggregate
fn build_global_aggregate_from_flat(
    flat_vals: &[i32],
    dims: &[usize],
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    if dims.is_empty() {
        return Err(CompilerError::IRGenerationError(
            "Invalid aggregate dimensions".to_string(),
        ));
    }
    if dims.len() == 1 {
        let vals: Vec<Value> = flat_vals
            .iter()
            .take(dims[0])
            .map(|v| ctx.program.new_value().integer(*v))
            .collect();
        return Ok(ctx.program.new_value().aggregate(vals));
    }
    let sub_size = product_dims(&dims[1..]);
    let mut elems = Vec::with_capacity(dims[0]);
    for i in 0..dims[0] {
        let start = i * sub_size;
        let end = start + sub_size;
        let sub_val = build_global_aggregate_from_flat(&flat_vals[start..end], &dims[1..], ctx)?;
        elems.push(sub_val);
    }
    Ok(ctx.program.new_value().aggregate(elems))
}

fn create_local_array_alloc(
    name: &str,
    array_type: Type,
    ctx: &mut IrContext,
) -> Result<Value, CompilerError> {
    let alloc_inst = ctx.dfg_mut()?.new_value().alloc(array_type);
    let scope_level = ctx.scopes.last().map(|s| s.0).unwrap_or(0);
    ctx.dfg_mut()?
        .set_value_name(alloc_inst, Some(format!("%{}_{}", name, scope_level)));
    ctx.push_inst(alloc_inst)?;
    Ok(alloc_inst)
}

fn store_local_array_i32(
    alloc_inst: Value,
    vals: &[i32],
    dims: &[usize],
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    for (idx, val) in vals.iter().enumerate() {
        let indices = linear_to_indices(idx, dims);
        let mut ptr = alloc_inst;
        for index in indices {
            let idx_val = ctx.dfg_mut()?.new_value().integer(index as i32);
            let next_ptr = ctx.dfg_mut()?.new_value().get_elem_ptr(ptr, idx_val);
            ctx.push_inst(next_ptr)?;
            ptr = next_ptr;
        }
        let int_val = ctx.dfg_mut()?.new_value().integer(*val);
        let store_inst = ctx.dfg_mut()?.new_value().store(int_val, ptr);
        ctx.push_inst(store_inst)?;
    }
    Ok(())
}

fn store_local_array_exprs(
    alloc_inst: Value,
    elems: &[Option<Expr>],
    dims: &[usize],
    ctx: &mut IrContext,
) -> Result<(), CompilerError> {
    for (idx, elem) in elems.iter().enumerate() {
        let indices = linear_to_indices(idx, dims);
        let mut ptr = alloc_inst;
        for index in indices {
            let idx_val = ctx.dfg_mut()?.new_value().integer(index as i32);
            let next_ptr = ctx.dfg_mut()?.new_value().get_elem_ptr(ptr, idx_val);
            ctx.push_inst(next_ptr)?;
            ptr = next_ptr;
        }
        let val = if let Some(expr) = elem {
            expr.generate_ir(ctx)?
        } else {
            ctx.dfg_mut()?.new_value().integer(0)
        };
        let store_inst = ctx.dfg_mut()?.new_value().store(val, ptr);
        ctx.push_inst(store_inst)?;
    }
    Ok(())
}

impl GenerateIR for FuncDef {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        let f = *ctx.func_table.get(&self.name).ok_or_else(|| {
            CompilerError::IRGenerationError(format!("Function `{}` was not declared", self.name))
        })?;
        ctx.current_func = Some(f);
        ctx.array_param_dims.clear();

        // 形参类型与数组形参的维度信息
        let mut param_tys = Vec::new();
        let mut param_dims = Vec::new();
        for param in &self.params {
            let (param_ty, dims) = build_param_type(param, ctx)?;
            param_tys.push(param_ty);
            param_dims.push(dims);
        }

        let entry = ctx.new_bb("entry")?;
        ctx.enter_bb(entry)?;

        // 函数体作用域
        ctx.push_scope();

        // 处理函数参数：为每个参数分配内存并存储
        let param_values: Vec<Value> = ctx.program.func(f).params().to_vec();
        for (idx, param) in self.params.iter().enumerate() {
            let param_value = param_values[idx];
            let param_alloc_ty = if param.is_array {
                param_tys[idx].clone()
            } else {
                Type::get_i32()
            };
            let param_alloc = ctx.dfg_mut()?.new_value().alloc(param_alloc_ty);
            ctx.push_inst(param_alloc)?;

            let store_inst = ctx.dfg_mut()?.new_value().store(param_value, param_alloc);
            ctx.push_inst(store_inst)?;

            // 将参数地址加入符号表
            ctx.insert_var(param.name.clone(), param_alloc)?;
            if param.is_array {
                let total_dims = 1 + param_dims[idx].as_ref().map(|d| d.len()).unwrap_or(0);
                ctx.array_param_dims.insert(param.name.clone(), total_dims);
            }
        }

        for item in &self.body {
            // 当前基本块已有终结指令时，其后的语句不可达，直接跳过
            let current_bb = ctx.get_current_bb()?;
            if ctx.has_terminator(current_bb)? {
                break;
            }
            match item {
                BlockItem::Decl(decl) => {
                    decl.generate_ir(ctx)?;
                }
                BlockItem::Stmt(stmt) => {
                    stmt.generate_ir(ctx)?;
                    let current_bb = ctx.get_current_bb()?;
                    if ctx.has_terminator(current_bb)? {
                        break;
                    }
                }
            }
        }

        // 末尾基本块未终结时按返回类型补默认 ret
        let current_bb = ctx.get_current_bb()?;
        if !ctx.has_terminator(current_bb)? {
            let ret_inst = match self.ty {
                DataType::Int => {
                    let zero = ctx.dfg_mut()?.new_value().integer(0);
                    ctx.dfg_mut()?.new_value().ret(Some(zero))
                }
                DataType::Void => ctx.dfg_mut()?.new_value().ret(None),
            };
            ctx.push_inst(ret_inst)?;
        }

        ctx.pop_scope()?;
        Ok(())
    }
}

impl GenerateIR for Stmt {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Stmt::Return(expr) => generate_return_stmt_ir(expr, ctx),
            Stmt::Assign(lval, expr) => generate_assign_stmt_ir(lval, expr, ctx),
            Stmt::Block(block) => generate_block_stmt_ir(block, ctx),
            Stmt::Expr(expr) => generate_expr_stmt_ir(expr, ctx),
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => generate_if_stmt_ir(cond, then_stmt, else_stmt.as_deref(), ctx),
            Stmt::While { cond, body, .. } => generate_while_stmt_ir(cond, body, ctx),
            Stmt::Break(span) => generate_break_stmt_ir(span, ctx),
            Stmt::Continue(span) => generate_continue_stmt_ir(span, ctx),
        }
    }
}

impl GenerateIR for Expr {
    type Output = Value;

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Expr::IntLiteral(n, _) => {
                if ctx.current_func.is_none() {
                    Ok(ctx.program.new_value().integer(*n))
                } else {
                    Ok(ctx.dfg_mut()?.new_value().integer(*n))
                }
            }
            Expr::LVal(lval) => generate_lval_ir(lval, ctx),
            Expr::UnaryOp(op, expr, _) => generate_unary_op_ir(op, expr, ctx),
            Expr::BinaryOp(op, lhs, rhs, _) => generate_binary_op_ir(op, lhs, rhs, ctx),
            Expr::RelOp(op, lhs, rhs, _) => generate_rel_op_ir(op, lhs, rhs, ctx),
            Expr::EqOp(op, lhs, rhs, _) => generate_eq_op_ir(op, lhs, rhs, ctx),
            Expr::LAndOp(_, lhs, rhs, _) => generate_land_op_ir(lhs, rhs, ctx),
            Expr::LOrOp(_, lhs, rhs, _) => generate_lor_op_ir(lhs, rhs, ctx),
            Expr::Call(name, args, span) => generate_call_ir(name, args, *span, ctx),
        }
    }
}

impl GenerateIR for Decl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        match self {
            Decl::ConstDecl(decl) => decl.generate_ir(ctx)?,
            Decl::VarDecl(decl) => decl.generate_ir(ctx)?,
        }
        Ok(())
    }
}

impl GenerateIR for ConstDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        let is_global = ctx.current_func.is_none();
        for def in &self.defs {
            if !def.dims.is_empty() {
                // 常量数组
                let dims = eval_array_dims(&def.dims, def.span, ctx)?;
                let array_type = build_array_type_from_dims(&dims);
                let vals = flatten_const_init(&def.init, &dims, ctx)?;
                if is_global {
                    let aggregate = build_global_aggregate_from_flat(&vals, &dims, ctx)?;
                    let global_alloc = ctx.program.new_value().global_alloc(aggregate);
                    ctx.program
                        .set_value_name(global_alloc, Some(format!("@{}", def.name)));
                    ctx.insert_global_var(def.name.clone(), global_alloc)?;
                    // 常量数组参与下标读取的折叠，且禁止写入
                    ctx.global_constants.insert(def.name.clone());
                    ctx.const_arrays.insert(global_alloc);
                } else {
                    let alloc_inst = create_local_array_alloc(&def.name, array_type, ctx)?;
                    store_local_array_i32(alloc_inst, &vals, &dims, ctx)?;
                    ctx.insert_var(def.name.clone(), alloc_inst)?;
                    ctx.const_arrays.insert(alloc_inst);
                }
            } else {
                // 标量常量：编译时求值，符号表中直接绑定整型常量
                match &def.init {
                    ConstInitVal::Single(expr) => {
                        let val = evaluate_const_expr(expr, ctx)?;
                        if is_global {
                            let init_val = ctx.program.new_value().integer(val);
                            ctx.insert_global_var(def.name.clone(), init_val)?;
                            ctx.global_constants.insert(def.name.clone());
                        } else {
                            let init_val = ctx.dfg_mut()?.new_value().integer(val);
                            ctx.insert_var(def.name.clone(), init_val)?;
                        }
                    }
                    ConstInitVal::List(_) => {
                        return Err(CompilerError::IRGenerationError(
                            "Scalar const cannot be initialized with a list".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl GenerateIR for VarDecl {
    type Output = ();

    fn generate_ir(&self, ctx: &mut IrContext) -> Result<Self::Output, CompilerError> {
        let is_global = ctx.current_func.is_none();
        for def in &self.defs {
            if !def.dims.is_empty() {
                // 数组变量
                let dims = eval_array_dims(&def.dims, def.span, ctx)?;
                let array_type = build_array_type_from_dims(&dims);

                if is_global {
                    // 全局数组：初始化器必须整体折叠为常量
                    let init_val = match &def.init {
                        Some(init) => {
                            let flattened = flatten_var_init(init, &dims)?;
                            let mut vals = Vec::with_capacity(flattened.len());
                            for elem in flattened {
                                if let Some(expr) = elem {
                                    vals.push(evaluate_const_expr(&expr, ctx)?);
                                } else {
                                    vals.push(0);
                                }
                            }
                            build_global_aggregate_from_flat(&vals, &dims, ctx)?
                        }
                        None => ctx.program.new_value().zero_init(array_type),
                    };
                    let global_alloc = ctx.program.new_value().global_alloc(init_val);
                    ctx.program
                        .set_value_name(global_alloc, Some(format!("@{}", def.name)));
                    ctx.insert_global_var(def.name.clone(), global_alloc)?;
                } else {
                    let alloc_inst = create_local_array_alloc(&def.name, array_type, ctx)?;
                    if let Some(init) = &def.init {
                        let flattened = flatten_var_init(init, &dims)?;
                        store_local_array_exprs(alloc_inst, &flattened, &dims, ctx)?;
                    }
                    ctx.insert_var(def.name.clone(), alloc_inst)?;
                }
            } else {
                // 标量变量
                if is_global {
                    let init_val = if let Some(init) = &def.init {
                        match init {
                            InitVal::Single(expr) => {
                                // 全局初始值必须是常量表达式
                                let val = evaluate_const_expr(expr, ctx)?;
                                ctx.program.new_value().integer(val)
                            }
                            InitVal::List(_) => {
                                return Err(CompilerError::IRGenerationError(
                                    "Scalar variable cannot be initialized with a list".to_string(),
                                ));
                            }
                        }
                    } else {
                        // 未初始化的全局变量用 zeroinit
                        ctx.program.new_value().zero_init(Type::get_i32())
                    };
                    let global_alloc = ctx.program.new_value().global_alloc(init_val);
                    ctx.program
                        .set_value_name(global_alloc, Some(format!("@{}", def.name)));
                    ctx.insert_global_var(def.name.clone(), global_alloc)?;
                } else {
                    // 局部变量：分配栈槽
                    let alloc_inst = ctx.dfg_mut()?.new_value().alloc(Type::get_i32());
                    let scope_level = ctx.scopes.last().map(|s| s.0).unwrap_or(0);
                    ctx.dfg_mut()?
                        .set_value_name(alloc_inst, Some(format!("%{}_{}", def.name, scope_level)));
                    ctx.push_inst(alloc_inst)?;

                    if let Some(init) = &def.init {
                        match init {
                            InitVal::Single(expr) => {
                                let init_val = expr.generate_ir(ctx)?;
                                let store_inst =
                                    ctx.dfg_mut()?.new_value().store(init_val, alloc_inst);
                                ctx.push_inst(store_inst)?;
                            }
                            InitVal::List(_) => {
                                return Err(CompilerError::IRGenerationError(
                                    "Scalar variable cannot be initialized with a list".to_string(),
                                ));
                            }
                        }
                    }

                    ctx.insert_var(def.name.clone(), alloc_inst)?;
                }
            }
        }
        Ok(())
    }
}

// 供表达式生成使用的零/一常量
pub(crate) fn create_zero_integer(ctx: &mut IrContext) -> Result<Value, CompilerError> {
    Ok(ctx.dfg_mut()?.new_value().integer(0))
}

pub(crate) fn create_one_integer(ctx: &mut IrContext) -> Result<Value, CompilerError> {
    Ok(ctx.dfg_mut()?.new_value().integer(1))
}

// 生成 (val != 0)，将任意整数规范化为 0/1
pub(crate) fn generate_neq_zero(val: Value, ctx: &mut IrContext) -> Result<Value, CompilerError> {
    let zero = create_zero_integer(ctx)?;
    ctx.emit_binary(BinaryOp::NotEq, val, zero)
}

// 判断符号是否绑定到整型常量（局部常量与全局标量常量）
pub(crate) fn is_const_integer(val: Value, ctx: &IrContext) -> bool {
    ctx.value_int(val).is_some()
}

// 符号是否绑定到可寻址的存储（局部 alloc 或全局变量）
pub(crate) fn is_addressable(val: Value, ctx: &IrContext) -> Result<bool, CompilerError> {
    if let Some(f) = ctx.current_func {
        if let Some(data) = ctx.program.func(f).dfg().try_value(val) {
            return Ok(matches!(data.kind(), ValueKind::Alloc));
        }
    }
    match ctx.program.try_borrow_value(val) {
        Some(data) => Ok(matches!(data.kind(), ValueKind::GlobalAlloc(_))),
        None => Ok(false),
    }
}
