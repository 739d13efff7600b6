use std::collections::{HashMap, HashSet};

use crate::front::ast::Span;
use crate::ir::{
    BasicBlock, BinaryOp, DataFlowGraph, Function, Program, Type, Value, ValueKind,
};
use crate::utils::SourceMap;
use crate::CompilerError;

/// IR 生成上下文：模块、构建游标、作用域栈与循环栈。
pub struct IrContext {
    pub program: Program,
    pub current_func: Option<Function>,
    pub current_bb: Option<BasicBlock>,
    pub scopes: Vec<(i32, HashMap<String, Value>)>,
    pub source_map: Option<SourceMap>,
    /// 全局作用域：存储全局变量和常量
    pub global_scope: HashMap<String, Value>,
    /// 全局常量集合：标量常量与常量数组的名字
    pub global_constants: HashSet<String>,
    /// 常量数组对应的存储（局部 alloc 或全局 alloc），禁止写入
    pub const_arrays: HashSet<Value>,
    /// 循环栈：记录每一层循环的 (continue_target_bb, break_target_bb)
    pub loop_stack: Vec<(BasicBlock, BasicBlock)>,
    /// 函数符号表：函数名 -> Function handle
    pub func_table: HashMap<String, Function>,
    /// 当前函数的数组形参维度数（首维省略时也计入）
    pub array_param_dims: HashMap<String, usize>,
}

impl IrContext {
    pub fn new(source_map: Option<SourceMap>) -> Self {
        Self {
            program: Program::new(),
            current_func: None,
            current_bb: None,
            scopes: Vec::new(),
            source_map,
            global_scope: HashMap::new(),
            global_constants: HashSet::new(),
            const_arrays: HashSet::new(),
            loop_stack: Vec::new(),
            func_table: HashMap::new(),
            array_param_dims: HashMap::new(),
        }
    }

    pub fn format_location(&self, offset: usize) -> Option<String> {
        self.source_map.as_ref().map(|sm| sm.format_location(offset))
    }

    pub fn error_at_span(&self, message: impl Into<String>, span: Span) -> CompilerError {
        let mut msg = message.into();
        if let Some(loc) = self.format_location(span.begin) {
            msg = format!("{} at {}", msg, loc);
        }
        CompilerError::IRGenerationError(msg)
    }

    pub fn get_current_bb(&self) -> Result<BasicBlock, CompilerError> {
        self.current_bb
            .ok_or_else(|| CompilerError::IRGenerationError("No current basic block".to_string()))
    }

    pub fn current_func(&self) -> Result<Function, CompilerError> {
        self.current_func
            .ok_or_else(|| CompilerError::IRGenerationError("No current function".to_string()))
    }

    pub fn dfg(&self) -> Result<&DataFlowGraph, CompilerError> {
        let f = self.current_func()?;
        Ok(self.program.func(f).dfg())
    }

    pub fn dfg_mut(&mut self) -> Result<&mut DataFlowGraph, CompilerError> {
        let f = self.current_func()?;
        Ok(self.program.func_mut(f).dfg_mut())
    }

    /// Push a new scope onto the stack
    pub fn push_scope(&mut self) {
        let next_level = self.scopes.last().map(|s| s.0 + 1).unwrap_or(0);
        self.scopes.push((next_level, HashMap::new()));
    }

    /// Pop the current scope from the stack
    pub fn pop_scope(&mut self) -> Result<(), CompilerError> {
        self.scopes.pop().ok_or_else(|| {
            CompilerError::IRGenerationError("Cannot pop scope: no scope on stack".to_string())
        })?;
        Ok(())
    }

    /// Look up a variable in the scope stack (from innermost to outermost)
    pub fn lookup_var(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(&val) = scope.1.get(name) {
                return Some(val);
            }
        }
        self.global_scope.get(name).copied()
    }

    /// Insert a variable into the current scope
    /// Returns an error if the variable is already declared in the current scope
    pub fn insert_var(&mut self, name: String, value: Value) -> Result<(), CompilerError> {
        let current_scope = self.scopes.last_mut().ok_or_else(|| {
            CompilerError::IRGenerationError("Cannot insert variable: no scope on stack".to_string())
        })?;
        if current_scope.1.contains_key(&name) {
            return Err(CompilerError::IRGenerationError(format!(
                "Variable `{}` already declared in this scope",
                name
            )));
        }
        current_scope.1.insert(name, value);
        Ok(())
    }

    pub fn insert_global_var(&mut self, name: String, value: Value) -> Result<(), CompilerError> {
        if self.global_scope.contains_key(&name) {
            return Err(CompilerError::IRGenerationError(format!(
                "Global variable `{}` already declared",
                name
            )));
        }
        self.global_scope.insert(name, value);
        Ok(())
    }

    /// 创建基本块但不挂入布局；块在开始填充内容时才通过 `enter_bb` 挂入，
    /// 因此文本中的块顺序就是生成顺序。
    pub fn new_bb(&mut self, name: &str) -> Result<BasicBlock, CompilerError> {
        let name = format!("%{}", name);
        Ok(self.dfg_mut()?.new_bb().basic_block(Some(name)))
    }

    pub fn new_bb_with_params(
        &mut self,
        name: &str,
        param_tys: Vec<Type>,
    ) -> Result<BasicBlock, CompilerError> {
        let name = format!("%{}", name);
        Ok(self
            .dfg_mut()?
            .new_bb()
            .basic_block_with_params(Some(name), param_tys))
    }

    /// 将基本块挂入布局并设为当前插入点
    pub fn enter_bb(&mut self, bb: BasicBlock) -> Result<(), CompilerError> {
        let f = self.current_func()?;
        self.program.func_mut(f).layout_mut().push_bb(bb);
        self.current_bb = Some(bb);
        Ok(())
    }

    pub fn bb_param(&self, bb: BasicBlock, index: usize) -> Result<Value, CompilerError> {
        let params = self.dfg()?.bb(bb).params();
        params.get(index).copied().ok_or_else(|| {
            CompilerError::IRGenerationError("Basic block parameter index out of range".to_string())
        })
    }

    pub fn has_terminator(&self, bb: BasicBlock) -> Result<bool, CompilerError> {
        let f = self.current_func()?;
        let func_data = self.program.func(f);
        match func_data.layout().last_inst(bb) {
            Some(inst) => Ok(func_data.dfg().value(inst).kind().is_terminator()),
            None => Ok(false),
        }
    }

    pub fn push_inst(&mut self, inst: Value) -> Result<(), CompilerError> {
        let bb = self.get_current_bb()?;
        let f = self.current_func()?;
        self.program.func_mut(f).layout_mut().push_inst(bb, inst);
        Ok(())
    }

    /// 生成二元运算；两个操作数都是常量时构建器已折叠，折叠结果不进布局
    pub fn emit_binary(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, CompilerError> {
        let value = self.dfg_mut()?.new_value().binary(op, lhs, rhs);
        if matches!(self.dfg()?.value(value).kind(), ValueKind::Integer(_)) {
            return Ok(value);
        }
        self.push_inst(value)?;
        Ok(value)
    }

    /// 值为整型常量时取其值（局部与全局都查）
    pub fn value_int(&self, value: Value) -> Option<i32> {
        if let Some(f) = self.current_func {
            if let Some(data) = self.program.func(f).dfg().try_value(value) {
                return match data.kind() {
                    ValueKind::Integer(i) => Some(i.value()),
                    _ => None,
                };
            }
        }
        match self.program.try_borrow_value(value)?.kind() {
            ValueKind::Integer(i) => Some(i.value()),
            _ => None,
        }
    }

    /// 值的类型（局部与全局都查）
    pub fn value_ty(&self, value: Value) -> Result<Type, CompilerError> {
        if let Some(f) = self.current_func {
            if let Some(data) = self.program.func(f).dfg().try_value(value) {
                return Ok(data.ty().clone());
            }
        }
        self.program
            .try_borrow_value(value)
            .map(|data| data.ty().clone())
            .ok_or_else(|| {
                CompilerError::IRGenerationError("Value not found in function or module".to_string())
            })
    }
}
