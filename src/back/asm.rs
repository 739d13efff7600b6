//! # 汇编代码生成模块
//!
//! 为每种 Koopa IR 指令实现对应的 RISC-V 生成逻辑。
//!
//! ## 寄存器约定
//!
//! - t0/t1：左右操作数与结果
//! - t2：getelemptr/getptr 的元素大小
//! - t6：大偏移的地址物化，从不保存操作数
//! - a0-a7：调用实参与返回值
//!
//! ## 控制流
//!
//! - 每个函数只有一处尾声，标签为 `<fname>_epilogue`，ret 统一跳转过去
//! - br 先 beqz 到本地假边标签，两条边各自完成块参数传递后 j 到目标

use crate::back::context::Context;
use crate::back::frame::FrameLayout;
use crate::back::insts::{Instruction, Reg};
use crate::back::utils::{load_reg_with_offset, store_reg_with_offset};
use crate::ir::entities::{
    Binary, Branch, Call, GetElemPtr, GetPtr, Jump, Load, Return, Store,
};
use crate::ir::{
    BasicBlock, BinaryOp, FunctionData, Program, Type, TypeKind, Value, ValueData, ValueKind,
};
use crate::CompilerError;

/// 宏：简化二元运算的代码生成
///
/// 根据操作类型生成一条或两条 RISC-V 指令
macro_rules! gen_binary_op {
    // 单指令操作
    ($ctx:expr, $dest:expr, $lhs:expr, $rhs:expr, $inst:path) => {
        $ctx.program.push($inst($dest, $lhs, $rhs))
    };
    // 比较后取反（sgt+xori / slt+xori）
    ($ctx:expr, $dest:expr, $lhs:expr, $rhs:expr, [$inst1:path, xori]) => {{
        $ctx.program.push($inst1($dest, $lhs, $rhs));
        $ctx.program.push(Instruction::Xori($dest, $dest, 1));
    }};
    // 两指令操作：先算再归一（sub+seqz / sub+snez）
    ($ctx:expr, $dest:expr, $lhs:expr, $rhs:expr, [$inst1:path, $inst2:path]) => {{
        $ctx.program.push($inst1($dest, $lhs, $rhs));
        $ctx.program.push($inst2($dest, $dest));
    }};
}

pub trait GenerateAsm {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError>;
}

impl GenerateAsm for Program {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        // 全局变量：生成 .data 段
        for &global in self.inst_layout() {
            generate_global_alloc(program, ctx, global)?;
        }

        // 函数：生成 .text 段；声明没有基本块，不输出任何内容
        for &func in self.func_layout() {
            let func_data = self.func(func);
            if func_data.is_decl() {
                continue;
            }
            ctx.current_func = Some(func);
            func_data.generate(program, ctx)?;
        }
        Ok(())
    }
}

impl GenerateAsm for FunctionData {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        let name = &self.name()[1..];
        ctx.reset_for_function();
        ctx.current_func_name = name.to_string();
        ctx.program.push(Instruction::Section(".text".to_string()));
        ctx.program.push(Instruction::Global(name.to_string()));
        ctx.program.push(Instruction::Label(name.to_string()));

        // 栈帧规划：发射前所有栈槽偏移已经确定
        ctx.frame = FrameLayout::compute(self);

        // 基本块标签：入口块复用函数标签，其余用 {函数名}_{块名}
        for (idx, &bb) in self.layout().bbs().iter().enumerate() {
            let label = if idx == 0 {
                name.to_string()
            } else {
                match self.dfg().bb(bb).name() {
                    Some(bb_name) => format!("{}_{}", name, bb_name.trim_start_matches('%')),
                    None => format!("{}_bb{}", name, idx - 1),
                }
            };
            ctx.bb_label_map.insert(bb, label);
        }

        // 序言：开栈、存 ra、把实参落到各自的栈槽
        if ctx.frame.frame_size > 0 {
            ctx.update_stack_pointer(-ctx.frame.frame_size);
        }
        if ctx.frame.has_call {
            let ra_offset = ctx.frame.ra_offset;
            store_reg_with_offset(ctx, Reg::Ra, ra_offset);
        }
        for (idx, &param) in self.params().iter().enumerate() {
            let offset = ctx.slot_offset(param)?;
            if idx < 8 {
                store_reg_with_offset(ctx, Reg::ARGS[idx], offset);
            } else {
                // 溢出实参在调用者帧中：sp + frame_size + (idx-8)*4
                let src = ctx.frame.frame_size + ((idx - 8) * 4) as i32;
                load_reg_with_offset(ctx, Reg::T0, src);
                store_reg_with_offset(ctx, Reg::T0, offset);
            }
        }

        // 逐块逐指令发射
        for (idx, &bb) in self.layout().bbs().iter().enumerate() {
            if idx > 0 {
                let label = ctx.bb_label(bb)?;
                ctx.program.push(Instruction::Label(label));
            }
            for &inst in self.layout().insts(bb) {
                ctx.current_inst = Some(inst);
                self.dfg().value(inst).generate(program, ctx)?;
            }
        }

        // 尾声：回收栈帧，恢复 ra
        ctx.program.push(Instruction::Label(ctx.epilogue_label()));
        if ctx.frame.has_call {
            let ra_offset = ctx.frame.ra_offset;
            load_reg_with_offset(ctx, Reg::Ra, ra_offset);
        }
        if ctx.frame.frame_size > 0 {
            ctx.update_stack_pointer(ctx.frame.frame_size);
        }
        ctx.program.push(Instruction::Ret);
        Ok(())
    }
}

impl GenerateAsm for ValueData {
    fn generate(&self, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
        match self.kind() {
            ValueKind::Return(ret) => generate_return(ret, program, ctx),
            ValueKind::Binary(bin) => generate_binary(bin, program, ctx),
            ValueKind::Alloc => Ok(()), // 栈槽在规划阶段分好，地址按需计算
            ValueKind::Load(load) => generate_load(load, program, ctx),
            ValueKind::Store(store) => generate_store(store, program, ctx),
            ValueKind::Branch(branch) => generate_branch(branch, program, ctx),
            ValueKind::Jump(jump) => generate_jump(jump, program, ctx),
            ValueKind::Call(call) => generate_call(call, program, ctx),
            ValueKind::GetElemPtr(gep) => generate_get_elem_ptr(gep, program, ctx),
            ValueKind::GetPtr(gp) => generate_get_ptr(gp, program, ctx),
            _ => Ok(()),
        }
    }
}

fn current_func_data<'a>(program: &'a Program, ctx: &Context) -> Result<&'a FunctionData, CompilerError> {
    let func = ctx.current_func.ok_or_else(|| {
        CompilerError::CodeGenerationError("No current function context".to_string())
    })?;
    Ok(program.func(func))
}

fn current_inst(ctx: &Context) -> Result<Value, CompilerError> {
    ctx.current_inst.ok_or_else(|| {
        CompilerError::CodeGenerationError("No current instruction context".to_string())
    })
}

// 值的类型：先查函数局部，再查全局
fn value_ty(program: &Program, func_data: &FunctionData, value: Value) -> Result<Type, CompilerError> {
    if let Some(data) = func_data.dfg().try_value(value) {
        return Ok(data.ty().clone());
    }
    program
        .try_borrow_value(value)
        .map(|data| data.ty().clone())
        .ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Value {:?} not found", value))
        })
}

// 处理 Return 指令：返回值进 a0，跳到统一尾声
fn generate_return(ret: &Return, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    if let Some(value) = ret.value() {
        let func_data = current_func_data(program, ctx)?;
        ctx.load_operand(func_data, value, Reg::A0)?;
    }
    let label = ctx.epilogue_label();
    ctx.program.push(Instruction::J(label));
    Ok(())
}

// 处理全局变量：.data 段与初始化数据
fn generate_global_alloc(
    program: &Program,
    ctx: &mut Context,
    value: Value,
) -> Result<(), CompilerError> {
    let (name, init) = {
        let data = program.borrow_value(value);
        let init = match data.kind() {
            ValueKind::GlobalAlloc(alloc) => alloc.init(),
            _ => return Ok(()),
        };
        let name_with_at = data.name().clone().ok_or_else(|| {
            CompilerError::CodeGenerationError(format!("Global variable {:?} has no name", value))
        })?;
        (name_with_at.trim_start_matches('@').to_string(), init)
    };

    ctx.global_alloc_map.insert(value, name.clone());

    ctx.program.push(Instruction::Section(".data".to_string()));
    ctx.program.push(Instruction::Global(name.clone()));
    ctx.program.push(Instruction::Label(name));
    emit_global_init(init, program, ctx)?;
    Ok(())
}

fn emit_global_init(value: Value, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let kind = program.borrow_value(value).kind().clone();
    match kind {
        ValueKind::Integer(i) => {
            ctx.program.push(Instruction::Word(i.value()));
            Ok(())
        }
        ValueKind::ZeroInit => {
            let size = program.borrow_value(value).ty().size() as i32;
            ctx.program.push(Instruction::Zero(size));
            Ok(())
        }
        ValueKind::Aggregate(agg) => {
            for &elem in agg.elems() {
                emit_global_init(elem, program, ctx)?;
            }
            Ok(())
        }
        _ => Err(CompilerError::CodeGenerationError(
            "Unsupported global initializer".to_string(),
        )),
    }
}

// 处理 Load 指令：指针值进 t0，再间接取数
fn generate_load(load: &Load, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func_data = current_func_data(program, ctx)?;
    ctx.load_operand(func_data, load.src(), Reg::T0)?;
    ctx.program.push(Instruction::Lw(Reg::T0, 0, Reg::T0));
    ctx.store_result(inst, Reg::T0)
}

// 处理 Store 指令：值进 t0，地址进 t1
fn generate_store(store: &Store, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func_data = current_func_data(program, ctx)?;
    ctx.load_operand(func_data, store.value(), Reg::T0)?;
    ctx.load_operand(func_data, store.dest(), Reg::T1)?;
    ctx.program.push(Instruction::Sw(Reg::T0, 0, Reg::T1));
    Ok(())
}

// 地址步进：基址 t0 + 下标 t1 * 元素大小 t2
fn generate_ptr_step(
    src: Value,
    index: Value,
    elem_size: i32,
    program: &Program,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func_data = current_func_data(program, ctx)?;
    ctx.load_operand(func_data, src, Reg::T0)?;
    ctx.load_operand(func_data, index, Reg::T1)?;
    ctx.program.push(Instruction::Li(Reg::T2, elem_size));
    ctx.program.push(Instruction::Mul(Reg::T1, Reg::T1, Reg::T2));
    ctx.program.push(Instruction::Add(Reg::T0, Reg::T0, Reg::T1));
    ctx.store_result(inst, Reg::T0)
}

// 处理 GetElemPtr：步长为所指数组的元素大小
fn generate_get_elem_ptr(
    gep: &GetElemPtr,
    program: &Program,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    let func_data = current_func_data(program, ctx)?;
    let src_ty = value_ty(program, func_data, gep.src())?;
    let elem_size = match src_ty.kind() {
        TypeKind::Pointer(base) => match base.kind() {
            TypeKind::Array(elem, _) => elem.size() as i32,
            _ => {
                return Err(CompilerError::CodeGenerationError(
                    "GetElemPtr source is not a pointer to an array".to_string(),
                ))
            }
        },
        _ => {
            return Err(CompilerError::CodeGenerationError(
                "GetElemPtr source is not a pointer".to_string(),
            ))
        }
    };
    generate_ptr_step(gep.src(), gep.index(), elem_size, program, ctx)
}

// 处理 GetPtr：步长为指针所指对象的大小
fn generate_get_ptr(gp: &GetPtr, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func_data = current_func_data(program, ctx)?;
    let src_ty = value_ty(program, func_data, gp.src())?;
    let elem_size = match src_ty.kind() {
        TypeKind::Pointer(base) => base.size() as i32,
        _ => {
            return Err(CompilerError::CodeGenerationError(
                "GetPtr source is not a pointer".to_string(),
            ))
        }
    };
    generate_ptr_step(gp.src(), gp.index(), elem_size, program, ctx)
}

// 处理 Binary 指令
fn generate_binary(bin: &Binary, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let inst = current_inst(ctx)?;
    let func_data = current_func_data(program, ctx)?;
    ctx.load_operand(func_data, bin.lhs(), Reg::T0)?;
    ctx.load_operand(func_data, bin.rhs(), Reg::T1)?;

    let (d, l, r) = (Reg::T0, Reg::T0, Reg::T1);
    match bin.op() {
        BinaryOp::Add => gen_binary_op!(ctx, d, l, r, Instruction::Add),
        BinaryOp::Sub => gen_binary_op!(ctx, d, l, r, Instruction::Sub),
        BinaryOp::Mul => gen_binary_op!(ctx, d, l, r, Instruction::Mul),
        BinaryOp::Div => gen_binary_op!(ctx, d, l, r, Instruction::Div),
        BinaryOp::Mod => gen_binary_op!(ctx, d, l, r, Instruction::Rem),
        BinaryOp::And => gen_binary_op!(ctx, d, l, r, Instruction::And),
        BinaryOp::Or => gen_binary_op!(ctx, d, l, r, Instruction::Or),
        BinaryOp::Lt => gen_binary_op!(ctx, d, l, r, Instruction::Slt),
        BinaryOp::Gt => gen_binary_op!(ctx, d, l, r, Instruction::Sgt),
        BinaryOp::Le => gen_binary_op!(ctx, d, l, r, [Instruction::Sgt, xori]),
        BinaryOp::Ge => gen_binary_op!(ctx, d, l, r, [Instruction::Slt, xori]),
        BinaryOp::Eq => gen_binary_op!(ctx, d, l, r, [Instruction::Sub, Instruction::Seqz]),
        BinaryOp::NotEq => gen_binary_op!(ctx, d, l, r, [Instruction::Sub, Instruction::Snez]),
    }

    ctx.store_result(inst, Reg::T0)
}

// 入边上的块参数传递：实参经 t1 写入目标块参数的栈槽
fn emit_edge_transfers(
    target: BasicBlock,
    args: &[Value],
    program: &Program,
    ctx: &mut Context,
) -> Result<(), CompilerError> {
    if args.is_empty() {
        return Ok(());
    }
    let func_data = current_func_data(program, ctx)?;
    let params = func_data.dfg().bb(target).params().to_vec();
    for (&param, &arg) in params.iter().zip(args) {
        ctx.load_operand(func_data, arg, Reg::T1)?;
        let offset = ctx.slot_offset(param)?;
        store_reg_with_offset(ctx, Reg::T1, offset);
    }
    Ok(())
}

// 处理 Branch 指令：
//   beqz cond, 假边标签; 真边传参后 j true; 假边标签: 假边传参后 j false
fn generate_branch(branch: &Branch, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let func_data = current_func_data(program, ctx)?;
    ctx.load_operand(func_data, branch.cond(), Reg::T0)?;

    let true_label = ctx.bb_label(branch.true_bb())?;
    let false_label = ctx.bb_label(branch.false_bb())?;
    let false_edge = ctx.fresh_label("br");

    ctx.program.push(Instruction::Beqz(Reg::T0, false_edge.clone()));
    emit_edge_transfers(branch.true_bb(), branch.true_args(), program, ctx)?;
    ctx.program.push(Instruction::J(true_label));
    ctx.program.push(Instruction::Label(false_edge));
    emit_edge_transfers(branch.false_bb(), branch.false_args(), program, ctx)?;
    ctx.program.push(Instruction::J(false_label));
    Ok(())
}

// 处理 Jump 指令
fn generate_jump(jump: &Jump, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    emit_edge_transfers(jump.target(), jump.args(), program, ctx)?;
    let label = ctx.bb_label(jump.target())?;
    ctx.program.push(Instruction::J(label));
    Ok(())
}

// 处理 Call 指令：前 8 个实参进 a0-a7，其余写入出参区
fn generate_call(call: &Call, program: &Program, ctx: &mut Context) -> Result<(), CompilerError> {
    let callee = program.func(call.callee());
    let callee_name = callee.name()[1..].to_string();
    let ret_is_void = callee.ret_ty().is_void();

    for (idx, &arg) in call.args().iter().enumerate() {
        let func_data = current_func_data(program, ctx)?;
        ctx.load_operand(func_data, arg, Reg::T0)?;
        if idx < 8 {
            ctx.program.push(Instruction::Mv(Reg::ARGS[idx], Reg::T0));
        } else {
            store_reg_with_offset(ctx, Reg::T0, ((idx - 8) * 4) as i32);
        }
    }

    ctx.program.push(Instruction::Call(callee_name));

    if !ret_is_void {
        let inst = current_inst(ctx)?;
        ctx.store_result(inst, Reg::A0)?;
    }
    Ok(())
}
