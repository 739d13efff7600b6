use super::{Block, DataType, Decl, Expr, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct FuncFParam {
    pub ty: DataType,
    pub name: String,
    // 数组形参：首维在源码中省略，dims 只含内层维度
    pub is_array: bool,
    pub dims: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub ty: DataType,
    pub name: String,
    pub params: Vec<FuncFParam>,
    pub body: Block,
    pub span: Span,
}

// CompUnit ::= [CompUnit] (Decl | FuncDef);
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalItem {
    Decl(Decl),
    FuncDef(FuncDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompUnit {
    pub items: Vec<GlobalItem>,
}
