//! IR 文本形式的序列化。
//!
//! 命名规则：全局值与函数带 `@` 前缀，局部值与基本块带 `%` 前缀；
//! 未命名的值按出现顺序取 `%N`，计数器跳过已命名的值；
//! 命名冲突时追加 `_N`（N 取最小可用值），保证再次打印结果逐字节稳定。

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::ir::entities::*;

/// 将整个模块序列化为 IR 文本
pub fn emit_ir(program: &Program) -> String {
    let mut out = String::new();
    for &global in program.inst_layout() {
        write_global(program, global, &mut out);
    }
    let mut need_blank = !program.inst_layout().is_empty();
    for &func in program.func_layout() {
        let data = program.func(func);
        if data.is_decl() {
            if need_blank {
                out.push('\n');
                need_blank = false;
            }
            write_decl(data, &mut out);
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            need_blank = false;
            write_function(program, data, &mut out);
        }
    }
    out
}

fn write_global(program: &Program, global: Value, out: &mut String) {
    let data = program.borrow_value(global);
    let name = data.name().clone().unwrap_or_else(|| "@g".into());
    let init = match data.kind() {
        ValueKind::GlobalAlloc(alloc) => alloc.init(),
        _ => return,
    };
    let init_ty = data.ty().pointee().expect("global has a pointer type").clone();
    let _ = writeln!(
        out,
        "global {} = alloc {}, {}",
        name,
        init_ty,
        init_str(program, init)
    );
}

fn init_str(program: &Program, init: Value) -> String {
    let data = program.borrow_value(init);
    match data.kind() {
        ValueKind::Integer(i) => i.value().to_string(),
        ValueKind::ZeroInit => "zeroinit".into(),
        ValueKind::Aggregate(agg) => {
            let elems: Vec<String> = agg
                .elems()
                .iter()
                .map(|&elem| init_str(program, elem))
                .collect();
            format!("{{{}}}", elems.join(", "))
        }
        _ => unreachable!("invalid global initializer"),
    }
}

fn write_decl(func: &FunctionData, out: &mut String) {
    let params: Vec<String> = func
        .ty()
        .param_types()
        .unwrap_or(&[])
        .iter()
        .map(|ty| ty.to_string())
        .collect();
    let _ = write!(out, "decl {}({})", func.name(), params.join(", "));
    if !func.ret_ty().is_void() {
        let _ = write!(out, ": {}", func.ret_ty());
    }
    out.push('\n');
}

// 函数内的名字分配器
struct NameManager {
    names: HashMap<Value, String>,
    used: HashSet<String>,
    next_slot: usize,
}

impl NameManager {
    fn new() -> Self {
        Self {
            names: HashMap::new(),
            used: HashSet::new(),
            next_slot: 0,
        }
    }

    fn assign(&mut self, value: Value, requested: &Option<String>) -> String {
        let name = match requested {
            Some(name) => self.uniquify(name.clone()),
            None => {
                let name = format!("%{}", self.next_slot);
                self.next_slot += 1;
                self.uniquify(name)
            }
        };
        self.used.insert(name.clone());
        self.names.insert(value, name.clone());
        name
    }

    fn uniquify(&self, name: String) -> String {
        if !self.used.contains(&name) {
            return name;
        }
        let mut n = 0;
        loop {
            let candidate = format!("{}_{}", name, n);
            if !self.used.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn get(&self, value: Value) -> Option<&String> {
        self.names.get(&value)
    }
}

fn write_function(program: &Program, func: &FunctionData, out: &mut String) {
    let dfg = func.dfg();
    let layout = func.layout();
    let mut nm = NameManager::new();
    let mut bb_names: HashMap<BasicBlock, String> = HashMap::new();

    // 先统一分配名字，使文本中名字的出现顺序与编号一致
    for &param in func.params() {
        nm.assign(param, dfg.value(param).name());
    }
    for &bb in layout.bbs() {
        let bb_data = dfg.bb(bb);
        let name = match bb_data.name() {
            Some(name) => nm.uniquify(name.clone()),
            None => {
                let slot = format!("%{}", nm.next_slot);
                nm.next_slot += 1;
                nm.uniquify(slot)
            }
        };
        nm.used.insert(name.clone());
        bb_names.insert(bb, name);
        for &param in bb_data.params() {
            nm.assign(param, dfg.value(param).name());
        }
        for &inst in layout.insts(bb) {
            if !dfg.value(inst).ty().is_void() {
                nm.assign(inst, dfg.value(inst).name());
            }
        }
    }

    let params: Vec<String> = func
        .params()
        .iter()
        .map(|&param| {
            let name = nm.get(param).cloned().unwrap_or_default();
            format!("{}: {}", name, dfg.value(param).ty())
        })
        .collect();
    let _ = write!(out, "fun {}({})", func.name(), params.join(", "));
    if !func.ret_ty().is_void() {
        let _ = write!(out, ": {}", func.ret_ty());
    }
    out.push_str(" {\n");

    for (idx, &bb) in layout.bbs().iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let bb_data = dfg.bb(bb);
        let _ = write!(out, "{}", bb_names[&bb]);
        if !bb_data.params().is_empty() {
            let params: Vec<String> = bb_data
                .params()
                .iter()
                .map(|&param| {
                    let name = nm.get(param).cloned().unwrap_or_default();
                    format!("{}: {}", name, dfg.value(param).ty())
                })
                .collect();
            let _ = write!(out, "({})", params.join(", "));
        }
        out.push_str(":\n");
        for &inst in layout.insts(bb) {
            write_inst(program, func, &nm, &bb_names, inst, out);
        }
    }
    out.push_str("}\n");
}

fn operand_str(program: &Program, func: &FunctionData, nm: &NameManager, value: Value) -> String {
    if let Some(data) = func.dfg().try_value(value) {
        if let ValueKind::Integer(i) = data.kind() {
            return i.value().to_string();
        }
        if let Some(name) = nm.get(value) {
            return name.clone();
        }
        return "%?".into();
    }
    // 全局值：常量按字面量打印，其余按模块级名字
    let data = program.borrow_value(value);
    match data.kind() {
        ValueKind::Integer(i) => i.value().to_string(),
        _ => data.name().clone().unwrap_or_else(|| "@?".into()),
    }
}

fn target_str(
    program: &Program,
    func: &FunctionData,
    nm: &NameManager,
    bb_names: &HashMap<BasicBlock, String>,
    target: BasicBlock,
    args: &[Value],
) -> String {
    let name = bb_names
        .get(&target)
        .cloned()
        .unwrap_or_else(|| "%?".into());
    if args.is_empty() {
        name
    } else {
        let args: Vec<String> = args
            .iter()
            .map(|&arg| operand_str(program, func, nm, arg))
            .collect();
        format!("{}({})", name, args.join(", "))
    }
}

fn write_inst(
    program: &Program,
    func: &FunctionData,
    nm: &NameManager,
    bb_names: &HashMap<BasicBlock, String>,
    inst: Value,
    out: &mut String,
) {
    let dfg = func.dfg();
    let data = dfg.value(inst);
    let op = |v| operand_str(program, func, nm, v);
    match data.kind() {
        ValueKind::Alloc => {
            let pointee = data.ty().pointee().expect("alloc has a pointer type");
            let _ = writeln!(out, "  {} = alloc {}", nm.get(inst).unwrap(), pointee);
        }
        ValueKind::Load(load) => {
            let _ = writeln!(out, "  {} = load {}", nm.get(inst).unwrap(), op(load.src()));
        }
        ValueKind::Store(store) => {
            let _ = writeln!(out, "  store {}, {}", op(store.value()), op(store.dest()));
        }
        ValueKind::GetElemPtr(gep) => {
            let _ = writeln!(
                out,
                "  {} = getelemptr {}, {}",
                nm.get(inst).unwrap(),
                op(gep.src()),
                op(gep.index())
            );
        }
        ValueKind::GetPtr(gp) => {
            let _ = writeln!(
                out,
                "  {} = getptr {}, {}",
                nm.get(inst).unwrap(),
                op(gp.src()),
                op(gp.index())
            );
        }
        ValueKind::Binary(bin) => {
            let _ = writeln!(
                out,
                "  {} = {} {}, {}",
                nm.get(inst).unwrap(),
                bin.op().mnemonic(),
                op(bin.lhs()),
                op(bin.rhs())
            );
        }
        ValueKind::Branch(br) => {
            let _ = writeln!(
                out,
                "  br {}, {}, {}",
                op(br.cond()),
                target_str(program, func, nm, bb_names, br.true_bb(), br.true_args()),
                target_str(program, func, nm, bb_names, br.false_bb(), br.false_args())
            );
        }
        ValueKind::Jump(jump) => {
            let _ = writeln!(
                out,
                "  jump {}",
                target_str(program, func, nm, bb_names, jump.target(), jump.args())
            );
        }
        ValueKind::Call(call) => {
            let callee = program.func(call.callee());
            let args: Vec<String> = call.args().iter().map(|&arg| op(arg)).collect();
            if data.ty().is_void() {
                let _ = writeln!(out, "  call {}({})", callee.name(), args.join(", "));
            } else {
                let _ = writeln!(
                    out,
                    "  {} = call {}({})",
                    nm.get(inst).unwrap(),
                    callee.name(),
                    args.join(", ")
                );
            }
        }
        ValueKind::Return(ret) => match ret.value() {
            Some(value) => {
                let _ = writeln!(out, "  ret {}", op(value));
            }
            None => {
                let _ = writeln!(out, "  ret");
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::Type;

    #[test]
    fn emits_global_and_function() {
        let mut program = Program::new();
        let init = program.new_value().integer(10);
        let global = program.new_value().global_alloc(init);
        program.set_value_name(global, Some("@g".into()));

        let mut main = FunctionData::new("@main".into(), vec![], Type::get_i32());
        let bb = main.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        main.layout_mut().push_bb(bb);
        let dfg = main.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_i32());
        let one = dfg.new_value().integer(1);
        let store = dfg.new_value().store(one, slot);
        let load = dfg.new_value().load(slot);
        let ret = dfg.new_value().ret(Some(load));
        for inst in [slot, store, load, ret] {
            main.layout_mut().push_inst(bb, inst);
        }
        program.new_func(main);

        let text = emit_ir(&program);
        assert!(text.contains("global @g = alloc i32, 10"));
        assert!(text.contains("fun @main(): i32 {"));
        assert!(text.contains("%entry:"));
        assert!(text.contains("%0 = alloc i32"));
        assert!(text.contains("store 1, %0"));
        assert!(text.contains("%1 = load %0"));
        assert!(text.contains("ret %1"));
    }

    #[test]
    fn emits_decl_without_body() {
        let mut program = Program::new();
        let decl = FunctionData::new(
            "@putarray".into(),
            vec![Type::get_i32(), Type::get_pointer(Type::get_i32())],
            Type::get_void(),
        );
        program.new_func(decl);
        let text = emit_ir(&program);
        assert_eq!(text, "decl @putarray(i32, *i32)\n");
    }

    #[test]
    fn block_params_render_with_types() {
        let mut program = Program::new();
        let mut func = FunctionData::new("@f".into(), vec![], Type::get_i32());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        let join = func
            .dfg_mut()
            .new_bb()
            .basic_block_with_params(Some("%join".into()), vec![Type::get_i32()]);
        func.layout_mut().push_bb(entry);
        func.layout_mut().push_bb(join);
        let dfg = func.dfg_mut();
        let one = dfg.new_value().integer(1);
        let jump = dfg.new_value().jump_with_args(join, vec![one]);
        let param = dfg.bb(join).params()[0];
        let ret = dfg.new_value().ret(Some(param));
        func.layout_mut().push_inst(entry, jump);
        func.layout_mut().push_inst(join, ret);
        program.new_func(func);

        let text = emit_ir(&program);
        assert!(text.contains("jump %join(1)"));
        assert!(text.contains("%join(%0: i32):"));
        assert!(text.contains("ret %0"));
    }

    #[test]
    fn named_values_skip_slot_numbers() {
        let mut program = Program::new();
        let mut func = FunctionData::new("@f".into(), vec![], Type::get_i32());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        func.layout_mut().push_bb(entry);
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_i32());
        dfg.set_value_name(slot, Some("%x_0".into()));
        let load = dfg.new_value().load(slot);
        let ret = dfg.new_value().ret(Some(load));
        for inst in [slot, load, ret] {
            func.layout_mut().push_inst(entry, inst);
        }
        program.new_func(func);

        let text = emit_ir(&program);
        assert!(text.contains("%x_0 = alloc i32"));
        // 命名值不占用编号，第一个未命名值仍是 %0
        assert!(text.contains("%0 = load %x_0"));
    }
}
