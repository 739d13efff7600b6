//! 源码到 RV32 汇编的端到端测试

use std::fmt::Write;

use sysyc::back::generate_asm;
use sysyc::front::generate_ir;
use sysyc::sysy;

fn compile_asm(src: &str) -> String {
    let ast = sysy::CompUnitParser::new()
        .parse(src)
        .expect("source must parse");
    let program = generate_ir(&ast, None).expect("IR generation must succeed");
    generate_asm(&program).expect("code generation must succeed")
}

#[test]
fn identity_return_places_value_in_a0() {
    let asm = compile_asm("int main() { return 42; }");
    assert!(asm.contains("  .text"));
    assert!(asm.contains("  .globl main"));
    assert!(asm.contains("main:"));
    assert!(asm.contains("  li a0, 42"));
    assert!(asm.contains("  j main_epilogue"));
    assert!(asm.contains("main_epilogue:"));
    assert!(asm.contains("  ret"));
}

#[test]
fn leaf_function_does_not_save_ra() {
    let asm = compile_asm("int main() { int x = 1; return x; }");
    assert!(!asm.contains("sw ra"));
    assert!(!asm.contains("lw ra"));
}

#[test]
fn calls_save_and_restore_ra() {
    let asm = compile_asm("int main() { return getint(); }");
    assert!(asm.contains("sw ra"));
    assert!(asm.contains("lw ra"));
    assert!(asm.contains("  call getint"));
    // 返回值从 a0 写回结果槽
    assert!(asm.contains("sw a0"));
}

#[test]
fn globals_emit_data_section() {
    let asm = compile_asm(
        "int g = 5;
        int a[2] = {1, 2};
        int z[4];
        int main() { return g; }",
    );
    assert!(asm.contains("  .data"));
    assert!(asm.contains("  .globl g"));
    assert!(asm.contains("g:"));
    assert!(asm.contains("  .word 5"));
    assert!(asm.contains("  .word 1"));
    assert!(asm.contains("  .word 2"));
    assert!(asm.contains("  .zero 16"));
    assert!(asm.contains("  la t0, g"));
}

#[test]
fn comparison_lowering_uses_spec_sequences() {
    let asm = compile_asm(
        "int main() {
            int a = getint();
            int le = a <= 2;
            int ge = a >= 2;
            int eq = a == 2;
            int ne = a != 2;
            int lt = a < 2;
            int gt = a > 2;
            return le + ge + eq + ne + lt + gt;
        }",
    );
    assert!(asm.contains("  sgt t0, t0, t1"));
    assert!(asm.contains("  slt t0, t0, t1"));
    assert!(asm.contains("  xori t0, t0, 1"));
    assert!(asm.contains("  seqz t0, t0"));
    assert!(asm.contains("  snez t0, t0"));
}

#[test]
fn branch_uses_local_false_edge_label() {
    let asm = compile_asm(
        "int main() {
            int a = getint();
            if (a) { return 1; }
            return 2;
        }",
    );
    assert!(asm.contains("  beqz t0, Lmain_br_0"));
    assert!(asm.contains("Lmain_br_0:"));
    assert!(asm.contains("  j main_then"));
    assert!(asm.contains("main_then:"));
    assert!(asm.contains("main_end:"));
}

#[test]
fn block_arguments_transfer_through_param_slot() {
    let asm = compile_asm(
        "int main() {
            int a = getint();
            int b = getint();
            return a && b;
        }",
    );
    // 真假两条边各自把实参写入汇合块参数的栈槽
    assert!(asm.contains("main_land_rhs:"));
    assert!(asm.contains("main_land_end:"));
    assert!(asm.contains("  sw t1"));
}

#[test]
fn gep_scales_index_by_element_size() {
    let asm = compile_asm(
        "int a[2][3];
        int main() { return a[1][2]; }",
    );
    // 第一维步长 12 字节，第二维 4 字节
    assert!(asm.contains("  li t2, 12"));
    assert!(asm.contains("  li t2, 4"));
    assert!(asm.contains("  mul t1, t1, t2"));
    assert!(asm.contains("  add t0, t0, t1"));
}

#[test]
fn more_than_eight_args_spill_to_stack() {
    let asm = compile_asm(
        "int f(int a, int b, int c, int d, int e, int g, int h, int i, int j, int k) {
            return a + j + k;
        }
        int main() {
            return f(1, 2, 3, 4, 5, 6, 7, 8, 9, 10);
        }",
    );
    // 调用者：第 9、10 个实参写入出参区
    assert!(asm.contains("  sw t0, 0(sp)"));
    assert!(asm.contains("  sw t0, 4(sp)"));
    assert!(asm.contains("  mv a7, t0"));
    // 被调用者：前 8 个形参从 a0-a7 落栈
    assert!(asm.contains("  sw a0"));
    assert!(asm.contains("  sw a7"));
    assert!(asm.contains("  call f"));
}

#[test]
fn large_frame_uses_wide_offset_sequences() {
    let mut body = String::new();
    for i in 0..600 {
        let _ = writeln!(body, "int x{} = {};", i, i);
    }
    let src = format!(
        "int main() {{\n{}\nreturn x0 + x599;\n}}",
        body
    );
    let asm = compile_asm(&src);
    // 帧大小超过 imm12，开栈与访问都要经过 t6
    assert!(asm.contains("li t6"));
    assert!(asm.contains("  add sp, sp, t6"));
    assert!(asm.contains("  add t6, sp, t6"));
}

#[test]
fn void_function_call_has_no_result_store() {
    let asm = compile_asm(
        "void report(int x) { putint(x); }
        int main() { report(3); return 0; }",
    );
    assert!(asm.contains("  call putint"));
    assert!(asm.contains("  call report"));
    assert!(asm.contains("  mv a0, t0"));
}

#[test]
fn function_declarations_emit_no_text() {
    let asm = compile_asm("int main() { return 0; }");
    // 库函数只有声明，不应出现在 .text 中
    assert!(!asm.contains("getint:"));
    assert!(!asm.contains("putint:"));
}

#[test]
fn while_loop_structure() {
    let asm = compile_asm(
        "int main() {
            int i = 0;
            int s = 0;
            while (i < 10) { s = s + i; i = i + 1; }
            return s;
        }",
    );
    assert!(asm.contains("main_while_entry:"));
    assert!(asm.contains("main_while_body:"));
    assert!(asm.contains("main_while_end:"));
    assert!(asm.contains("  j main_while_entry"));
}

#[test]
fn local_array_init_stores_elements() {
    let asm = compile_asm(
        "int main() {
            int a[2][3] = {{1}, {2, 3}};
            return a[1][1];
        }",
    );
    // 局部数组逐元素 store，含补零
    assert!(asm.contains("  li t0, 1"));
    assert!(asm.contains("  li t0, 2"));
    assert!(asm.contains("  li t0, 3"));
    assert!(asm.contains("  sw t0, 0(t1)"));
}
