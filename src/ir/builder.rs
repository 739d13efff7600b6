//! 值与基本块的创建接口。
//!
//! 构建器在创建时完成类型推导并检查操作数的结构约束；
//! 二元运算在两个操作数都是整型常量时直接折叠为常量
//! （32 位补码，除零/模零得 0）。

use crate::ir::entities::*;
use crate::ir::types::{Type, TypeKind};

impl DataFlowGraph {
    pub fn new_value(&mut self) -> LocalBuilder<'_> {
        LocalBuilder { dfg: self }
    }

    pub fn new_bb(&mut self) -> BlockBuilder<'_> {
        BlockBuilder { dfg: self }
    }
}

impl Program {
    pub fn new_value(&mut self) -> GlobalBuilder<'_> {
        GlobalBuilder { program: self }
    }
}

/// 函数内值的构建器
pub struct LocalBuilder<'a> {
    dfg: &'a mut DataFlowGraph,
}

impl<'a> LocalBuilder<'a> {
    pub fn integer(self, value: i32) -> Value {
        self.dfg.register_value(ValueData::new(
            Type::get_i32(),
            ValueKind::Integer(Integer { value }),
        ))
    }

    pub fn alloc(self, ty: Type) -> Value {
        assert!(!ty.is_void(), "cannot allocate a void object");
        self.dfg
            .register_value(ValueData::new(Type::get_pointer(ty), ValueKind::Alloc))
    }

    pub fn load(self, src: Value) -> Value {
        let src_ty = self.dfg.value_ty(src);
        let pointee = src_ty
            .pointee()
            .expect("load requires a pointer operand")
            .clone();
        self.dfg.register_value(ValueData::new(
            pointee,
            ValueKind::Load(Load { src }),
        ))
    }

    pub fn store(self, value: Value, dest: Value) -> Value {
        let value_ty = self.dfg.value_ty(value);
        let dest_ty = self.dfg.value_ty(dest);
        assert_eq!(
            dest_ty.pointee(),
            Some(&value_ty),
            "store destination must point to the stored type"
        );
        self.dfg.register_value(ValueData::new(
            Type::get_void(),
            ValueKind::Store(Store { value, dest }),
        ))
    }

    pub fn binary(self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        // 两个操作数均为常量时折叠
        if let (Some(l), Some(r)) = (self.dfg.value_int(lhs), self.dfg.value_int(rhs)) {
            return self.integer(op.eval(l, r));
        }
        assert!(
            self.dfg.value_ty(lhs).is_i32() && self.dfg.value_ty(rhs).is_i32(),
            "binary operands must be i32"
        );
        self.dfg.register_value(ValueData::new(
            Type::get_i32(),
            ValueKind::Binary(Binary { op, lhs, rhs }),
        ))
    }

    pub fn get_elem_ptr(self, src: Value, index: Value) -> Value {
        let src_ty = self.dfg.value_ty(src);
        let elem = match src_ty.kind() {
            TypeKind::Pointer(base) => base
                .array_elem()
                .expect("getelemptr requires a pointer to an array")
                .clone(),
            _ => panic!("getelemptr requires a pointer operand"),
        };
        assert!(self.dfg.value_ty(index).is_i32(), "index must be i32");
        self.dfg.register_value(ValueData::new(
            Type::get_pointer(elem),
            ValueKind::GetElemPtr(GetElemPtr { src, index }),
        ))
    }

    pub fn get_ptr(self, src: Value, index: Value) -> Value {
        let src_ty = self.dfg.value_ty(src);
        assert!(src_ty.is_pointer(), "getptr requires a pointer operand");
        assert!(self.dfg.value_ty(index).is_i32(), "index must be i32");
        self.dfg.register_value(ValueData::new(
            src_ty,
            ValueKind::GetPtr(GetPtr { src, index }),
        ))
    }

    pub fn branch(self, cond: Value, true_bb: BasicBlock, false_bb: BasicBlock) -> Value {
        self.branch_with_args(cond, true_bb, false_bb, Vec::new(), Vec::new())
    }

    pub fn branch_with_args(
        self,
        cond: Value,
        true_bb: BasicBlock,
        false_bb: BasicBlock,
        true_args: Vec<Value>,
        false_args: Vec<Value>,
    ) -> Value {
        assert!(self.dfg.value_ty(cond).is_i32(), "branch condition must be i32");
        self.check_block_args(true_bb, &true_args);
        self.check_block_args(false_bb, &false_args);
        self.dfg.register_value(ValueData::new(
            Type::get_void(),
            ValueKind::Branch(Branch {
                cond,
                true_bb,
                false_bb,
                true_args,
                false_args,
            }),
        ))
    }

    pub fn jump(self, target: BasicBlock) -> Value {
        self.jump_with_args(target, Vec::new())
    }

    pub fn jump_with_args(self, target: BasicBlock, args: Vec<Value>) -> Value {
        self.check_block_args(target, &args);
        self.dfg.register_value(ValueData::new(
            Type::get_void(),
            ValueKind::Jump(Jump { target, args }),
        ))
    }

    pub fn call(self, callee: Function, args: Vec<Value>, ret_ty: Type) -> Value {
        self.dfg.register_value(ValueData::new(
            ret_ty,
            ValueKind::Call(Call { callee, args }),
        ))
    }

    pub fn ret(self, value: Option<Value>) -> Value {
        self.dfg.register_value(ValueData::new(
            Type::get_void(),
            ValueKind::Return(Return { value }),
        ))
    }

    // 跳转实参个数与类型必须和目标块的参数表一致
    fn check_block_args(&self, target: BasicBlock, args: &[Value]) {
        let params = self.dfg.bb(target).params().to_vec();
        assert_eq!(
            params.len(),
            args.len(),
            "block argument count does not match target parameters"
        );
        for (&param, &arg) in params.iter().zip(args) {
            assert_eq!(
                self.dfg.value(param).ty(),
                &self.dfg.value_ty(arg),
                "block argument type does not match target parameter"
            );
        }
    }
}

/// 基本块构建器，负责名字唯一化与块参数创建
pub struct BlockBuilder<'a> {
    dfg: &'a mut DataFlowGraph,
}

impl<'a> BlockBuilder<'a> {
    pub fn basic_block(self, name: Option<String>) -> BasicBlock {
        self.basic_block_with_params(name, Vec::new())
    }

    pub fn basic_block_with_params(self, name: Option<String>, param_tys: Vec<Type>) -> BasicBlock {
        let name = name.map(|n| uniquify_bb_name(self.dfg, n));
        let params = param_tys
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.dfg.register_value(ValueData::new(
                    ty,
                    ValueKind::BlockArgRef(BlockArgRef { index }),
                ))
            })
            .collect();
        let bb = BasicBlock::fresh();
        self.dfg.bbs.insert(bb, BasicBlockData::new(name, params));
        bb
    }
}

// 请求的名字已被占用时，追加 `_N`（N 取最小可用值）
fn uniquify_bb_name(dfg: &DataFlowGraph, name: String) -> String {
    let taken = |candidate: &str| {
        dfg.bbs
            .values()
            .any(|bb| bb.name().as_deref() == Some(candidate))
    };
    if !taken(&name) {
        return name;
    }
    let mut n = 0;
    loop {
        let candidate = format!("{}_{}", name, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// 全局值（常量与全局变量）的构建器
pub struct GlobalBuilder<'a> {
    program: &'a mut Program,
}

impl<'a> GlobalBuilder<'a> {
    pub fn integer(self, value: i32) -> Value {
        self.program.register_value(ValueData::new(
            Type::get_i32(),
            ValueKind::Integer(Integer { value }),
        ))
    }

    pub fn zero_init(self, ty: Type) -> Value {
        assert!(!ty.is_void(), "zeroinit requires a sized type");
        self.program
            .register_value(ValueData::new(ty, ValueKind::ZeroInit))
    }

    pub fn aggregate(self, elems: Vec<Value>) -> Value {
        assert!(!elems.is_empty(), "aggregate must not be empty");
        let elem_ty = self.program.borrow_value(elems[0]).ty().clone();
        for &elem in &elems {
            assert_eq!(
                self.program.borrow_value(elem).ty(),
                &elem_ty,
                "aggregate elements must share one type"
            );
        }
        let ty = Type::get_array(elem_ty, elems.len());
        self.program.register_value(ValueData::new(
            ty,
            ValueKind::Aggregate(Aggregate { elems }),
        ))
    }

    pub fn global_alloc(self, init: Value) -> Value {
        let init_ty = self.program.borrow_value(init).ty().clone();
        let value = self.program.register_value(ValueData::new(
            Type::get_pointer(init_ty),
            ValueKind::GlobalAlloc(GlobalAlloc { init }),
        ));
        self.program.push_global(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_func() -> FunctionData {
        FunctionData::new("@test".into(), vec![], Type::get_void())
    }

    #[test]
    fn binary_folds_constants() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let a = dfg.new_value().integer(6);
        let b = dfg.new_value().integer(7);
        let prod = dfg.new_value().binary(BinaryOp::Mul, a, b);
        assert!(matches!(dfg.value(prod).kind(), ValueKind::Integer(i) if i.value() == 42));
    }

    #[test]
    fn binary_fold_div_by_zero_gives_zero() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let a = dfg.new_value().integer(17);
        let z = dfg.new_value().integer(0);
        let div = dfg.new_value().binary(BinaryOp::Div, a, z);
        assert!(matches!(dfg.value(div).kind(), ValueKind::Integer(i) if i.value() == 0));
        let a = dfg.new_value().integer(17);
        let z = dfg.new_value().integer(0);
        let rem = dfg.new_value().binary(BinaryOp::Mod, a, z);
        assert!(matches!(dfg.value(rem).kind(), ValueKind::Integer(i) if i.value() == 0));
    }

    #[test]
    fn binary_does_not_fold_non_constants() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_i32());
        let loaded = dfg.new_value().load(slot);
        let one = dfg.new_value().integer(1);
        let sum = dfg.new_value().binary(BinaryOp::Add, loaded, one);
        assert!(matches!(dfg.value(sum).kind(), ValueKind::Binary(_)));
    }

    #[test]
    fn load_infers_pointee_type() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let arr_ty = Type::get_array(Type::get_i32(), 3);
        let slot = dfg.new_value().alloc(arr_ty.clone());
        assert_eq!(dfg.value(slot).ty(), &Type::get_pointer(arr_ty.clone()));
        let zero = dfg.new_value().integer(0);
        let elem = dfg.new_value().get_elem_ptr(slot, zero);
        assert_eq!(dfg.value(elem).ty(), &Type::get_pointer(Type::get_i32()));
        let loaded = dfg.new_value().load(elem);
        assert!(dfg.value(loaded).ty().is_i32());
    }

    #[test]
    fn get_ptr_keeps_pointer_type() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_pointer(Type::get_i32()));
        let ptr = dfg.new_value().load(slot);
        let idx = dfg.new_value().integer(2);
        let stepped = dfg.new_value().get_ptr(ptr, idx);
        assert_eq!(dfg.value(stepped).ty(), &Type::get_pointer(Type::get_i32()));
    }

    #[test]
    fn bb_names_are_uniquified() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let a = dfg.new_bb().basic_block(Some("%then".into()));
        let b = dfg.new_bb().basic_block(Some("%then".into()));
        let c = dfg.new_bb().basic_block(Some("%then".into()));
        assert_eq!(dfg.bb(a).name().as_deref(), Some("%then"));
        assert_eq!(dfg.bb(b).name().as_deref(), Some("%then_0"));
        assert_eq!(dfg.bb(c).name().as_deref(), Some("%then_1"));
    }

    #[test]
    fn block_params_are_typed() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let bb = dfg
            .new_bb()
            .basic_block_with_params(Some("%join".into()), vec![Type::get_i32()]);
        let params = dfg.bb(bb).params().to_vec();
        assert_eq!(params.len(), 1);
        assert!(dfg.value(params[0]).ty().is_i32());
        let one = dfg.new_value().integer(1);
        let jump = dfg.new_value().jump_with_args(bb, vec![one]);
        assert!(matches!(dfg.value(jump).kind(), ValueKind::Jump(j) if j.args().len() == 1));
    }

    #[test]
    #[should_panic(expected = "block argument count")]
    fn jump_arity_mismatch_panics() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let bb = dfg
            .new_bb()
            .basic_block_with_params(Some("%join".into()), vec![Type::get_i32()]);
        dfg.new_value().jump_with_args(bb, vec![]);
    }

    #[test]
    #[should_panic(expected = "store destination")]
    fn store_type_mismatch_panics() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_array(Type::get_i32(), 2));
        let one = dfg.new_value().integer(1);
        dfg.new_value().store(one, slot);
    }

    #[test]
    fn global_aggregate_type() {
        let mut program = Program::new();
        let elems: Vec<Value> = (0..4).map(|i| program.new_value().integer(i)).collect();
        let agg = program.new_value().aggregate(elems);
        assert_eq!(
            program.borrow_value(agg).ty(),
            &Type::get_array(Type::get_i32(), 4)
        );
        let global = program.new_value().global_alloc(agg);
        assert_eq!(
            program.borrow_value(global).ty(),
            &Type::get_pointer(Type::get_array(Type::get_i32(), 4))
        );
        assert_eq!(program.inst_layout(), &[global]);
    }

    #[test]
    fn def_use_side_table() {
        let mut func = test_func();
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_i32());
        let load1 = dfg.new_value().load(slot);
        let load2 = dfg.new_value().load(slot);
        assert_eq!(dfg.value_uses(slot), &[load1, load2]);
    }
}
