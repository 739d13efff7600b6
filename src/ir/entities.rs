use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::ir::types::Type;

// 句柄 id 全局递增，保证同一 Program 内局部值与全局值不会混淆
static NEXT_ID: AtomicU32 = AtomicU32::new(1);

fn next_id() -> u32 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// 值句柄。指令、常量、函数参数、基本块参数都是值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);

impl Value {
    pub(crate) fn fresh() -> Self {
        Value(next_id())
    }
}

/// 函数句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Function(u32);

impl Function {
    pub(crate) fn fresh() -> Self {
        Function(next_id())
    }
}

/// 基本块句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlock(u32);

impl BasicBlock {
    pub(crate) fn fresh() -> Self {
        BasicBlock(next_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    /// IR 文本中的助记符
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Eq => "eq",
            BinaryOp::NotEq => "ne",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<BinaryOp> {
        Some(match s {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "mod" => BinaryOp::Mod,
            "lt" => BinaryOp::Lt,
            "le" => BinaryOp::Le,
            "gt" => BinaryOp::Gt,
            "ge" => BinaryOp::Ge,
            "eq" => BinaryOp::Eq,
            "ne" => BinaryOp::NotEq,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// 32 位补码语义求值。除零、模零得 0，比较结果为 0/1。
    pub fn eval(&self, lhs: i32, rhs: i32) -> i32 {
        match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_div(rhs)
                }
            }
            BinaryOp::Mod => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_rem(rhs)
                }
            }
            BinaryOp::Lt => (lhs < rhs) as i32,
            BinaryOp::Le => (lhs <= rhs) as i32,
            BinaryOp::Gt => (lhs > rhs) as i32,
            BinaryOp::Ge => (lhs >= rhs) as i32,
            BinaryOp::Eq => (lhs == rhs) as i32,
            BinaryOp::NotEq => (lhs != rhs) as i32,
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Integer {
    pub(crate) value: i32,
}

impl Integer {
    pub fn value(&self) -> i32 {
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub(crate) elems: Vec<Value>,
}

impl Aggregate {
    pub fn elems(&self) -> &[Value] {
        &self.elems
    }
}

#[derive(Debug, Clone)]
pub struct FuncArgRef {
    pub(crate) index: usize,
}

impl FuncArgRef {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct BlockArgRef {
    pub(crate) index: usize,
}

impl BlockArgRef {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct GlobalAlloc {
    pub(crate) init: Value,
}

impl GlobalAlloc {
    pub fn init(&self) -> Value {
        self.init
    }
}

#[derive(Debug, Clone)]
pub struct Load {
    pub(crate) src: Value,
}

impl Load {
    pub fn src(&self) -> Value {
        self.src
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) value: Value,
    pub(crate) dest: Value,
}

impl Store {
    pub fn value(&self) -> Value {
        self.value
    }

    pub fn dest(&self) -> Value {
        self.dest
    }
}

#[derive(Debug, Clone)]
pub struct GetPtr {
    pub(crate) src: Value,
    pub(crate) index: Value,
}

impl GetPtr {
    pub fn src(&self) -> Value {
        self.src
    }

    pub fn index(&self) -> Value {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct GetElemPtr {
    pub(crate) src: Value,
    pub(crate) index: Value,
}

impl GetElemPtr {
    pub fn src(&self) -> Value {
        self.src
    }

    pub fn index(&self) -> Value {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub(crate) op: BinaryOp,
    pub(crate) lhs: Value,
    pub(crate) rhs: Value,
}

impl Binary {
    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn lhs(&self) -> Value {
        self.lhs
    }

    pub fn rhs(&self) -> Value {
        self.rhs
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub(crate) cond: Value,
    pub(crate) true_bb: BasicBlock,
    pub(crate) false_bb: BasicBlock,
    pub(crate) true_args: Vec<Value>,
    pub(crate) false_args: Vec<Value>,
}

impl Branch {
    pub fn cond(&self) -> Value {
        self.cond
    }

    pub fn true_bb(&self) -> BasicBlock {
        self.true_bb
    }

    pub fn false_bb(&self) -> BasicBlock {
        self.false_bb
    }

    pub fn true_args(&self) -> &[Value] {
        &self.true_args
    }

    pub fn false_args(&self) -> &[Value] {
        &self.false_args
    }
}

#[derive(Debug, Clone)]
pub struct Jump {
    pub(crate) target: BasicBlock,
    pub(crate) args: Vec<Value>,
}

impl Jump {
    pub fn target(&self) -> BasicBlock {
        self.target
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub(crate) callee: Function,
    pub(crate) args: Vec<Value>,
}

impl Call {
    pub fn callee(&self) -> Function {
        self.callee
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

#[derive(Debug, Clone)]
pub struct Return {
    pub(crate) value: Option<Value>,
}

impl Return {
    pub fn value(&self) -> Option<Value> {
        self.value
    }
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Integer(Integer),
    ZeroInit,
    Aggregate(Aggregate),
    FuncArgRef(FuncArgRef),
    BlockArgRef(BlockArgRef),
    Alloc,
    GlobalAlloc(GlobalAlloc),
    Load(Load),
    Store(Store),
    GetPtr(GetPtr),
    GetElemPtr(GetElemPtr),
    Binary(Binary),
    Branch(Branch),
    Jump(Jump),
    Call(Call),
    Return(Return),
}

impl ValueKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            ValueKind::Branch(_) | ValueKind::Jump(_) | ValueKind::Return(_)
        )
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self,
            ValueKind::Integer(_) | ValueKind::ZeroInit | ValueKind::Aggregate(_)
        )
    }

    /// 该指令引用的值操作数（不含基本块目标）
    pub fn value_uses(&self) -> Vec<Value> {
        match self {
            ValueKind::Aggregate(agg) => agg.elems.clone(),
            ValueKind::GlobalAlloc(g) => vec![g.init],
            ValueKind::Load(load) => vec![load.src],
            ValueKind::Store(store) => vec![store.value, store.dest],
            ValueKind::GetPtr(gp) => vec![gp.src, gp.index],
            ValueKind::GetElemPtr(gep) => vec![gep.src, gep.index],
            ValueKind::Binary(bin) => vec![bin.lhs, bin.rhs],
            ValueKind::Branch(br) => {
                let mut uses = vec![br.cond];
                uses.extend(br.true_args.iter().copied());
                uses.extend(br.false_args.iter().copied());
                uses
            }
            ValueKind::Jump(jump) => jump.args.clone(),
            ValueKind::Call(call) => call.args.clone(),
            ValueKind::Return(ret) => ret.value.into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueData {
    ty: Type,
    name: Option<String>,
    kind: ValueKind,
}

impl ValueData {
    pub(crate) fn new(ty: Type, kind: ValueKind) -> Self {
        Self {
            ty,
            name: None,
            kind,
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn name(&self) -> &Option<String> {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlockData {
    name: Option<String>,
    params: Vec<Value>,
}

impl BasicBlockData {
    pub(crate) fn new(name: Option<String>, params: Vec<Value>) -> Self {
        Self { name, params }
    }

    pub fn name(&self) -> &Option<String> {
        &self.name
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

pub(crate) type GlobalValueMap = Rc<RefCell<HashMap<Value, ValueData>>>;

/// 函数内的数据流图：局部值、基本块数据以及 def-use 边的旁表。
/// 通过共享的全局值表可以查到全局常量与全局变量的类型。
#[derive(Debug)]
pub struct DataFlowGraph {
    pub(crate) values: HashMap<Value, ValueData>,
    pub(crate) bbs: HashMap<BasicBlock, BasicBlockData>,
    pub(crate) used_by: HashMap<Value, Vec<Value>>,
    pub(crate) globals: GlobalValueMap,
}

impl DataFlowGraph {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            bbs: HashMap::new(),
            used_by: HashMap::new(),
            globals: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// 取局部值的数据。全局值请使用 `Program::borrow_value`。
    pub fn value(&self, value: Value) -> &ValueData {
        self.values
            .get(&value)
            .expect("value does not belong to this function")
    }

    pub fn try_value(&self, value: Value) -> Option<&ValueData> {
        self.values.get(&value)
    }

    pub fn set_value_name(&mut self, value: Value, name: Option<String>) {
        if let Some(data) = self.values.get_mut(&value) {
            data.set_name(name);
        }
    }

    pub fn bb(&self, bb: BasicBlock) -> &BasicBlockData {
        self.bbs
            .get(&bb)
            .expect("basic block does not belong to this function")
    }

    pub fn bbs(&self) -> &HashMap<BasicBlock, BasicBlockData> {
        &self.bbs
    }

    /// 引用了 `value` 的指令列表（def-use 旁表）
    pub fn value_uses(&self, value: Value) -> &[Value] {
        self.used_by.get(&value).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 值的类型；先查局部表，再查全局表
    pub(crate) fn value_ty(&self, value: Value) -> Type {
        if let Some(data) = self.values.get(&value) {
            return data.ty().clone();
        }
        self.globals
            .borrow()
            .get(&value)
            .expect("value not found in function or module")
            .ty()
            .clone()
    }

    /// 若为整型常量则取其值（用于构建期折叠）
    pub(crate) fn value_int(&self, value: Value) -> Option<i32> {
        let local = self.values.get(&value).map(|d| d.kind().clone());
        let kind = match local {
            Some(kind) => kind,
            None => self.globals.borrow().get(&value)?.kind().clone(),
        };
        match kind {
            ValueKind::Integer(i) => Some(i.value),
            _ => None,
        }
    }

    pub(crate) fn register_value(&mut self, data: ValueData) -> Value {
        let value = Value::fresh();
        for used in data.kind().value_uses() {
            self.used_by.entry(used).or_default().push(value);
        }
        self.values.insert(value, data);
        value
    }
}

/// 基本块与指令的布局：基本块序、每块内的指令序。
/// 第一个基本块即入口块。
#[derive(Debug)]
pub struct Layout {
    bbs: Vec<BasicBlock>,
    insts: HashMap<BasicBlock, Vec<Value>>,
}

impl Layout {
    fn new() -> Self {
        Self {
            bbs: Vec::new(),
            insts: HashMap::new(),
        }
    }

    pub fn bbs(&self) -> &[BasicBlock] {
        &self.bbs
    }

    pub fn entry_bb(&self) -> Option<BasicBlock> {
        self.bbs.first().copied()
    }

    pub fn push_bb(&mut self, bb: BasicBlock) {
        self.bbs.push(bb);
        self.insts.entry(bb).or_default();
    }

    pub fn insts(&self, bb: BasicBlock) -> &[Value] {
        self.insts.get(&bb).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn push_inst(&mut self, bb: BasicBlock, inst: Value) {
        self.insts.entry(bb).or_default().push(inst);
    }

    pub fn last_inst(&self, bb: BasicBlock) -> Option<Value> {
        self.insts.get(&bb).and_then(|insts| insts.last().copied())
    }
}

/// 函数：类型、带 `@` 前缀的名字、形参值以及数据流图与布局。
/// 布局为空的函数是声明。
#[derive(Debug)]
pub struct FunctionData {
    ty: Type,
    name: String,
    params: Vec<Value>,
    dfg: DataFlowGraph,
    layout: Layout,
}

impl FunctionData {
    pub fn new(name: String, param_tys: Vec<Type>, ret_ty: Type) -> Self {
        let params = param_tys.into_iter().map(|ty| (None, ty)).collect();
        Self::with_param_names(name, params, ret_ty)
    }

    pub fn with_param_names(
        name: String,
        params: Vec<(Option<String>, Type)>,
        ret_ty: Type,
    ) -> Self {
        debug_assert!(name.starts_with('@'), "function name must carry the @ prefix");
        let mut dfg = DataFlowGraph::new();
        let param_tys: Vec<Type> = params.iter().map(|(_, ty)| ty.clone()).collect();
        let param_vals = params
            .into_iter()
            .enumerate()
            .map(|(index, (pname, ty))| {
                let mut data = ValueData::new(ty, ValueKind::FuncArgRef(FuncArgRef { index }));
                data.set_name(pname);
                dfg.register_value(data)
            })
            .collect();
        Self {
            ty: Type::get_function(param_tys, ret_ty),
            name,
            params: param_vals,
            dfg,
            layout: Layout::new(),
        }
    }

    /// 函数名（带 `@` 前缀）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 函数类型
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// 返回值类型
    pub fn ret_ty(&self) -> &Type {
        self.ty.ret_type().expect("function type is not a function")
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn dfg(&self) -> &DataFlowGraph {
        &self.dfg
    }

    pub fn dfg_mut(&mut self) -> &mut DataFlowGraph {
        &mut self.dfg
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    /// 没有基本块的函数是声明（外部链接）
    pub fn is_decl(&self) -> bool {
        self.layout.bbs().is_empty()
    }
}

/// 模块：持有全部全局值与函数，并记录二者的声明顺序。
#[derive(Debug)]
pub struct Program {
    pub(crate) values: GlobalValueMap,
    inst_layout: Vec<Value>,
    funcs: HashMap<Function, FunctionData>,
    func_layout: Vec<Function>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(HashMap::new())),
            inst_layout: Vec::new(),
            funcs: HashMap::new(),
            func_layout: Vec::new(),
        }
    }

    /// 取全局值的数据
    pub fn borrow_value(&self, value: Value) -> Ref<'_, ValueData> {
        Ref::map(self.values.borrow(), |values| {
            values
                .get(&value)
                .expect("value does not belong to this program")
        })
    }

    pub fn try_borrow_value(&self, value: Value) -> Option<Ref<'_, ValueData>> {
        let values = self.values.borrow();
        if values.contains_key(&value) {
            Some(Ref::map(values, |values| values.get(&value).unwrap()))
        } else {
            None
        }
    }

    pub fn set_value_name(&mut self, value: Value, name: Option<String>) {
        if let Some(data) = self.values.borrow_mut().get_mut(&value) {
            data.set_name(name);
        }
    }

    pub fn new_func(&mut self, mut data: FunctionData) -> Function {
        // 共享全局值表，使函数内的构建器能推导全局操作数的类型
        data.dfg.globals = Rc::clone(&self.values);
        let func = Function::fresh();
        self.funcs.insert(func, data);
        self.func_layout.push(func);
        func
    }

    pub fn func(&self, func: Function) -> &FunctionData {
        self.funcs
            .get(&func)
            .expect("function does not belong to this program")
    }

    pub fn func_mut(&mut self, func: Function) -> &mut FunctionData {
        self.funcs
            .get_mut(&func)
            .expect("function does not belong to this program")
    }

    /// 函数的声明顺序
    pub fn func_layout(&self) -> &[Function] {
        &self.func_layout
    }

    /// 全局变量（global alloc）的声明顺序
    pub fn inst_layout(&self) -> &[Value] {
        &self.inst_layout
    }

    pub(crate) fn register_value(&mut self, data: ValueData) -> Value {
        let value = Value::fresh();
        self.values.borrow_mut().insert(value, data);
        value
    }

    pub(crate) fn push_global(&mut self, value: Value) {
        self.inst_layout.push(value);
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_decl_has_no_blocks() {
        let func = FunctionData::new(
            "@getint".into(),
            vec![],
            Type::get_i32(),
        );
        assert!(func.is_decl());
        assert_eq!(func.name(), "@getint");
        assert_eq!(func.ret_ty(), &Type::get_i32());
    }

    #[test]
    fn params_are_arg_refs() {
        let func = FunctionData::with_param_names(
            "@f".into(),
            vec![
                (Some("%a".into()), Type::get_i32()),
                (None, Type::get_pointer(Type::get_i32())),
            ],
            Type::get_void(),
        );
        assert_eq!(func.params().len(), 2);
        let a = func.dfg().value(func.params()[0]);
        assert!(matches!(a.kind(), ValueKind::FuncArgRef(r) if r.index() == 0));
        assert_eq!(a.name().as_deref(), Some("%a"));
        let b = func.dfg().value(func.params()[1]);
        assert!(matches!(b.kind(), ValueKind::FuncArgRef(r) if r.index() == 1));
        assert!(b.ty().is_pointer());
    }

    #[test]
    fn binary_op_eval_semantics() {
        assert_eq!(BinaryOp::Add.eval(i32::MAX, 1), i32::MIN);
        assert_eq!(BinaryOp::Div.eval(7, 0), 0);
        assert_eq!(BinaryOp::Mod.eval(7, 0), 0);
        assert_eq!(BinaryOp::Div.eval(i32::MIN, -1), i32::MIN);
        assert_eq!(BinaryOp::Lt.eval(1, 2), 1);
        assert_eq!(BinaryOp::Ge.eval(1, 2), 0);
        assert_eq!(BinaryOp::NotEq.eval(3, 3), 0);
    }

    #[test]
    fn mnemonic_round_trip() {
        for op in [
            BinaryOp::Add,
            BinaryOp::Sub,
            BinaryOp::Mul,
            BinaryOp::Div,
            BinaryOp::Mod,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Gt,
            BinaryOp::Ge,
            BinaryOp::Eq,
            BinaryOp::NotEq,
            BinaryOp::And,
            BinaryOp::Or,
        ] {
            assert_eq!(BinaryOp::from_mnemonic(op.mnemonic()), Some(op));
        }
    }
}
