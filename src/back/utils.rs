use crate::back::context::Context;
use crate::back::insts::{Instruction, Reg};

// 12 位有符号立即数范围
fn fits_imm12(offset: i32) -> bool {
    (-2048..=2047).contains(&offset)
}

/// 将寄存器存入 sp+offset；偏移超出 imm12 时经由 t6 物化地址。
/// t6 只用于地址计算，不会破坏操作数。
pub fn store_reg_with_offset(ctx: &mut Context, reg: Reg, offset: i32) {
    if fits_imm12(offset) {
        ctx.program.push(Instruction::Sw(reg, offset, Reg::Sp));
    } else {
        ctx.program.push(Instruction::Li(Reg::T6, offset));
        ctx.program.push(Instruction::Add(Reg::T6, Reg::Sp, Reg::T6));
        ctx.program.push(Instruction::Sw(reg, 0, Reg::T6));
    }
}

/// 从 sp+offset 读入寄存器，同样处理大偏移
pub fn load_reg_with_offset(ctx: &mut Context, reg: Reg, offset: i32) {
    if fits_imm12(offset) {
        ctx.program.push(Instruction::Lw(reg, offset, Reg::Sp));
    } else {
        ctx.program.push(Instruction::Li(Reg::T6, offset));
        ctx.program.push(Instruction::Add(Reg::T6, Reg::Sp, Reg::T6));
        ctx.program.push(Instruction::Lw(reg, 0, Reg::T6));
    }
}

/// 计算 sp+offset 的地址写入 reg（用于 alloc 对象取址）
pub fn addr_of_slot(ctx: &mut Context, reg: Reg, offset: i32) {
    if fits_imm12(offset) {
        ctx.program.push(Instruction::Addi(reg, Reg::Sp, offset));
    } else {
        ctx.program.push(Instruction::Li(Reg::T6, offset));
        ctx.program.push(Instruction::Add(reg, Reg::Sp, Reg::T6));
    }
}
