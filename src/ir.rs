//! # Koopa IR 核心
//!
//! 编译器的中间表示：带类型的类 SSA IR，使用基本块参数代替 PHI 指令。
//!
//! - `types`: 驻留的类型系统（结构相等即指针相等）
//! - `entities`: Program / FunctionData / BasicBlockData / ValueData 等实体
//! - `builder`: 指令创建接口，带类型推导与常量折叠
//! - `writer`: 文本形式序列化
//! - `reader`: 文本形式解析（与 writer 互为往返）

pub mod builder;
pub mod entities;
pub mod reader;
pub mod types;
pub mod writer;

pub use entities::{
    BasicBlock, BasicBlockData, BinaryOp, DataFlowGraph, Function, FunctionData, Layout, Program,
    Value, ValueData, ValueKind,
};
pub use types::{Type, TypeKind};
