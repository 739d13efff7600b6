//! 栈帧规划。
//!
//! 代码生成前为每个值定好栈槽：
//!
//! ```text
//! +--------------------+ <- sp + frame_size（调用者 sp）
//! |   Saved RA (4B)    |   仅当函数内有 call
//! +--------------------+
//! |   形参 / 块参数 /   |
//! |   alloc 对象 /      |
//! |   指令结果溢出槽     |
//! +--------------------+
//! |   出参区（> 8 个     |
//! |   实参的溢出部分）    |
//! +--------------------+ <- sp
//! ```
//!
//! 帧大小向上对齐到 16 字节。

use std::collections::HashMap;

use crate::ir::{FunctionData, Value, ValueKind};

pub struct FrameLayout {
    offsets: HashMap<Value, i32>,
    pub frame_size: i32,
    pub has_call: bool,
    pub max_call_args: usize,
    /// ra 的栈偏移（frame_size - 4，仅在 has_call 时有意义）
    pub ra_offset: i32,
    /// 出参区字节数
    pub arg_area: i32,
}

impl FrameLayout {
    pub fn empty() -> Self {
        Self {
            offsets: HashMap::new(),
            frame_size: 0,
            has_call: false,
            max_call_args: 0,
            ra_offset: 0,
            arg_area: 0,
        }
    }

    /// 扫描函数，计算所有栈槽偏移与最终帧大小
    pub fn compute(func: &FunctionData) -> Self {
        let dfg = func.dfg();
        let layout = func.layout();

        // 第一遍：统计 call 信息
        let mut has_call = false;
        let mut max_call_args = 0;
        for &bb in layout.bbs() {
            for &inst in layout.insts(bb) {
                if let ValueKind::Call(call) = dfg.value(inst).kind() {
                    has_call = true;
                    max_call_args = max_call_args.max(call.args().len());
                }
            }
        }
        let arg_area = (max_call_args.saturating_sub(8) * 4) as i32;

        // 第二遍：从出参区之上开始向上分配栈槽
        let mut offsets = HashMap::new();
        let mut cursor = arg_area;
        let mut place = |value: Value, size: i32, offsets: &mut HashMap<Value, i32>| {
            offsets.insert(value, cursor);
            cursor += size;
        };

        for &param in func.params() {
            place(param, 4, &mut offsets);
        }
        for &bb in layout.bbs() {
            for &param in dfg.bb(bb).params() {
                place(param, 4, &mut offsets);
            }
            for &inst in layout.insts(bb) {
                let data = dfg.value(inst);
                match data.kind() {
                    // alloc 的槽就是对象本身
                    ValueKind::Alloc => {
                        let size = data
                            .ty()
                            .pointee()
                            .map(|ty| ty.size())
                            .unwrap_or(0) as i32;
                        place(inst, size, &mut offsets);
                    }
                    _ if !data.ty().is_void() => place(inst, 4, &mut offsets),
                    _ => {}
                }
            }
        }

        let ra = if has_call { 4 } else { 0 };
        let frame_size = (cursor + ra + 15) / 16 * 16;
        Self {
            offsets,
            frame_size,
            has_call,
            max_call_args,
            ra_offset: frame_size - 4,
            arg_area,
        }
    }

    pub fn offset(&self, value: Value) -> Option<i32> {
        self.offsets.get(&value).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Program, Type};

    // 构造一个带 alloc、运算和调用的函数
    fn sample() -> (Program, FunctionData) {
        let mut program = Program::new();
        let callee = program.new_func(FunctionData::new(
            "@getint".into(),
            vec![],
            Type::get_i32(),
        ));
        let mut func = FunctionData::new("@main".into(), vec![], Type::get_i32());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        func.layout_mut().push_bb(entry);
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_array(Type::get_i32(), 4));
        let call = dfg.new_value().call(callee, vec![], Type::get_i32());
        let loaded = {
            let zero = dfg.new_value().integer(0);
            let gep = dfg.new_value().get_elem_ptr(slot, zero);
            let load = dfg.new_value().load(gep);
            func.layout_mut().push_inst(entry, slot);
            func.layout_mut().push_inst(entry, call);
            func.layout_mut().push_inst(entry, gep);
            func.layout_mut().push_inst(entry, load);
            load
        };
        let dfg = func.dfg_mut();
        let ret = dfg.new_value().ret(Some(loaded));
        func.layout_mut().push_inst(entry, ret);
        (program, func)
    }

    #[test]
    fn slots_are_disjoint_and_sized() {
        let (_program, func) = sample();
        let frame = FrameLayout::compute(&func);
        assert!(frame.has_call);
        // alloc [i32,4] 16 字节 + call/gep/load 各 4 字节 + ra 4 字节 -> 32
        assert_eq!(frame.frame_size, 32);
        assert_eq!(frame.ra_offset, 28);
        let mut seen = Vec::new();
        for &bb in func.layout().bbs() {
            for &inst in func.layout().insts(bb) {
                if let Some(off) = frame.offset(inst) {
                    assert!(off >= 0 && off < frame.frame_size);
                    seen.push(off);
                }
            }
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn frame_rounds_to_sixteen() {
        let mut func = FunctionData::new("@f".into(), vec![], Type::get_i32());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        func.layout_mut().push_bb(entry);
        let dfg = func.dfg_mut();
        let slot = dfg.new_value().alloc(Type::get_i32());
        let ret = dfg.new_value().ret(None);
        func.layout_mut().push_inst(entry, slot);
        func.layout_mut().push_inst(entry, ret);
        let frame = FrameLayout::compute(&func);
        assert!(!frame.has_call);
        assert_eq!(frame.frame_size, 16);
    }

    #[test]
    fn no_call_means_no_ra_slot() {
        let mut func = FunctionData::new("@f".into(), vec![], Type::get_void());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        func.layout_mut().push_bb(entry);
        let ret = func.dfg_mut().new_value().ret(None);
        func.layout_mut().push_inst(entry, ret);
        let frame = FrameLayout::compute(&func);
        assert_eq!(frame.frame_size, 0);
        assert_eq!(frame.arg_area, 0);
    }

    #[test]
    fn overflow_args_reserve_bottom_area() {
        let mut program = Program::new();
        let callee = program.new_func(FunctionData::new(
            "@many".into(),
            vec![Type::get_i32(); 10],
            Type::get_void(),
        ));
        let mut func = FunctionData::new("@caller".into(), vec![], Type::get_void());
        let entry = func.dfg_mut().new_bb().basic_block(Some("%entry".into()));
        func.layout_mut().push_bb(entry);
        let dfg = func.dfg_mut();
        let args: Vec<_> = (0..10).map(|i| dfg.new_value().integer(i)).collect();
        let call = dfg.new_value().call(callee, args, Type::get_void());
        let ret = dfg.new_value().ret(None);
        func.layout_mut().push_inst(entry, call);
        func.layout_mut().push_inst(entry, ret);
        let frame = FrameLayout::compute(&func);
        // 两个溢出实参占 8 字节出参区
        assert_eq!(frame.arg_area, 8);
        assert_eq!(frame.max_call_args, 10);
        // void call 不占结果槽
        assert_eq!(frame.offset(call), None);
    }
}
