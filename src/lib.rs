use lalrpop_util::lalrpop_mod;

pub mod back;
pub mod front;
pub mod ir;
pub mod utils;

pub use utils::CompilerError;

// 引用 lalrpop 生成的解析器，模块名来自 sysy.lalrpop
lalrpop_mod!(pub sysy);
