use std::collections::HashMap;

use crate::back::frame::FrameLayout;
use crate::back::insts::{Instruction, Reg};
use crate::back::program::AsmProgram;
use crate::back::utils::{addr_of_slot, load_reg_with_offset, store_reg_with_offset};
use crate::ir::{BasicBlock, Function, FunctionData, Value, ValueKind};
use crate::CompilerError;

/// 汇编代码生成上下文。
///
/// 不做寄存器分配：所有 SSA 值都在栈上，计算时按需装入
/// t0/t1，结果写回栈槽；t2 只用于 getelemptr/getptr 的元素大小，
/// t6 只用于大偏移的地址物化。
pub struct Context {
    /// 生成的汇编程序
    pub program: AsmProgram,
    /// 当前正在处理的函数
    pub current_func: Option<Function>,
    /// 当前函数名（用于生成标签）
    pub current_func_name: String,
    /// 当前正在处理的指令
    pub current_inst: Option<Value>,
    /// 当前函数的栈帧布局
    pub frame: FrameLayout,
    /// 全局 alloc Value 到变量名的映射
    pub global_alloc_map: HashMap<Value, String>,
    /// 基本块到标签名的映射
    pub bb_label_map: HashMap<BasicBlock, String>,
    /// 下一个局部标签 ID（用于条件分支的假边标签）
    pub next_label_id: usize,
}

impl Context {
    pub fn new() -> Self {
        Self {
            program: AsmProgram::new(),
            current_func: None,
            current_func_name: String::new(),
            current_inst: None,
            frame: FrameLayout::empty(),
            global_alloc_map: HashMap::new(),
            bb_label_map: HashMap::new(),
            next_label_id: 0,
        }
    }

    pub fn reset_for_function(&mut self) {
        self.current_func_name.clear();
        self.current_inst = None;
        self.frame = FrameLayout::empty();
        self.bb_label_map.clear();
        self.next_label_id = 0;
    }

    /// 生成一个新的局部标签：`L{func}_{prefix}_{id}`
    pub fn fresh_label(&mut self, prefix: &str) -> String {
        let id = self.next_label_id;
        self.next_label_id += 1;
        format!("L{}_{}_{}", self.current_func_name, prefix, id)
    }

    /// 当前函数的尾声标签
    pub fn epilogue_label(&self) -> String {
        format!("{}_epilogue", self.current_func_name)
    }

    /// 将值装入指定寄存器：
    /// - 整型常量：li
    /// - alloc：对象地址 sp+offset
    /// - 全局变量：la
    /// - 其余（形参、块参数、指令结果）：从栈槽读取
    pub fn load_operand(
        &mut self,
        func_data: &FunctionData,
        value: Value,
        reg: Reg,
    ) -> Result<(), CompilerError> {
        if let Some(data) = func_data.dfg().try_value(value) {
            match data.kind() {
                ValueKind::Integer(i) => {
                    self.program.push(Instruction::Li(reg, i.value()));
                    return Ok(());
                }
                ValueKind::Alloc => {
                    let offset = self.slot_offset(value)?;
                    addr_of_slot(self, reg, offset);
                    return Ok(());
                }
                _ => {
                    let offset = self.slot_offset(value)?;
                    load_reg_with_offset(self, reg, offset);
                    return Ok(());
                }
            }
        }
        if let Some(name) = self.global_alloc_map.get(&value).cloned() {
            self.program.push(Instruction::La(reg, name));
            return Ok(());
        }
        Err(CompilerError::CodeGenerationError(format!(
            "Operand {:?} not found in function or data section",
            value
        )))
    }

    /// 将寄存器写回值的栈槽
    pub fn store_result(&mut self, value: Value, reg: Reg) -> Result<(), CompilerError> {
        let offset = self.slot_offset(value)?;
        store_reg_with_offset(self, reg, offset);
        Ok(())
    }

    pub fn slot_offset(&self, value: Value) -> Result<i32, CompilerError> {
        self.frame.offset(value).ok_or_else(|| {
            CompilerError::CodeGenerationError(format!(
                "Value {:?} has no stack slot in the current frame",
                value
            ))
        })
    }

    pub fn bb_label(&self, bb: BasicBlock) -> Result<String, CompilerError> {
        self.bb_label_map.get(&bb).cloned().ok_or_else(|| {
            CompilerError::CodeGenerationError(format!(
                "Basic block {:?} not found in label map",
                bb
            ))
        })
    }

    /// 调整栈指针（处理立即数范围）
    pub fn update_stack_pointer(&mut self, offset: i32) {
        if (-2048..=2047).contains(&offset) {
            self.program.push(Instruction::Addi(Reg::Sp, Reg::Sp, offset));
        } else {
            self.program.push(Instruction::Li(Reg::T6, offset));
            self.program.push(Instruction::Add(Reg::Sp, Reg::Sp, Reg::T6));
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
