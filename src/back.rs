//! # 后端模块
//!
//! 后端把 Koopa IR 程序翻译为 RISC-V 32 位汇编。
//!
//! ## 代码生成策略
//!
//! 1. **栈帧规划**（`frame`）
//!    - 形参、基本块参数、alloc 对象与指令结果各占一个栈槽
//!    - 有 call 时在栈顶保留 ra，帧大小对齐到 16 字节
//!    - 实参超过 8 个时在栈底保留出参区
//!
//! 2. **指令选择**（`asm`）
//!    - 不做寄存器分配：操作数装入 t0/t1，算完写回栈槽
//!    - 基本块参数在每条入边上通过参数栈槽传值
//!    - 大于 imm12 范围的栈偏移经由 t6 物化
//!
//! 3. **全局变量**
//!    - 生成 `.data` 段，递归展开初始化器
//!
//! ## 模块结构
//!
//! - `frame`: 栈帧规划
//! - `asm`: 为每种 IR 指令生成汇编
//! - `insts`: RISC-V 指令与寄存器定义
//! - `program`: 汇编程序表示和格式化输出
//! - `context`: 代码生成上下文
//! - `utils`: 大偏移读写辅助

pub mod asm;
pub mod context;
pub mod frame;
pub mod insts;
pub mod program;
pub mod utils;

use crate::back::asm::GenerateAsm;
use crate::back::context::Context;
use crate::ir::Program;
use crate::CompilerError;

/// 从 Koopa IR 程序生成 RISC-V 汇编代码
pub fn generate_asm(program: &Program) -> Result<String, CompilerError> {
    let mut ctx = Context::new();
    program.generate(program, &mut ctx)?;
    Ok(ctx.program.dump())
}
