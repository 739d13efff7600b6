//! 源码到 IR 文本的端到端测试

use sysyc::front::generate_ir;
use sysyc::ir::reader::parse_ir;
use sysyc::ir::writer::emit_ir;
use sysyc::sysy;
use sysyc::CompilerError;

fn compile_ir(src: &str) -> String {
    let ast = sysy::CompUnitParser::new()
        .parse(src)
        .expect("source must parse");
    let program = generate_ir(&ast, None).expect("IR generation must succeed");
    emit_ir(&program)
}

fn compile_err(src: &str) -> CompilerError {
    let ast = sysy::CompUnitParser::new()
        .parse(src)
        .expect("source must parse");
    generate_ir(&ast, None).expect_err("IR generation must fail")
}

#[test]
fn identity_return() {
    let ir = compile_ir("int main() { return 42; }");
    assert!(ir.contains("fun @main(): i32 {"));
    assert!(ir.contains("%entry:"));
    assert!(ir.contains("  ret 42"));
}

#[test]
fn library_functions_are_declared() {
    let ir = compile_ir("int main() { return getint(); }");
    assert!(ir.contains("decl @getint(): i32"));
    assert!(ir.contains("decl @putint(i32)"));
    assert!(ir.contains("decl @getarray(*i32): i32"));
    assert!(ir.contains("call @getint()"));
}

#[test]
fn scoped_shadowing_uses_distinct_slots() {
    let ir = compile_ir("int main() { int x = 1; { int x = 2; return x; } }");
    assert!(ir.contains("%x_0 = alloc i32"));
    assert!(ir.contains("%x_1 = alloc i32"));
    // 返回的是内层 x
    assert!(ir.contains("load %x_1"));
    assert!(!ir.contains("load %x_0"));
}

#[test]
fn short_circuit_and_uses_block_params() {
    let ir = compile_ir("int main() { int a = 1; int b = 0; return a && b; }");
    assert!(ir.contains("%land_end(%"));
    assert!(ir.contains(": i32):"));
    assert!(ir.contains("%land_rhs:"));
    // 左边为假时经假边直接把 0 传给汇合块
    assert!(ir.contains("%land_end(0)"));
}

#[test]
fn short_circuit_or_uses_block_params() {
    let ir = compile_ir("int main() { int a = 1; int b = 0; return a || b; }");
    assert!(ir.contains("%lor_end(%"));
    assert!(ir.contains("%lor_end(1)"));
    assert!(ir.contains("%lor_rhs:"));
}

#[test]
fn short_circuit_protects_division_by_zero() {
    // 1/0 只出现在 rhs 分支；常量折叠后除零得 0，不会发射 div
    let ir = compile_ir("int f() { return 0 && (1 / 0); }\nint main() { return f(); }");
    assert!(!ir.contains("div"));
    assert!(ir.contains("%land_end(0)"));
}

#[test]
fn partial_array_init_flattens_row_major() {
    let ir = compile_ir("int a[2][3] = {{1}, {2, 3}};\nint main() { return 0; }");
    assert!(ir.contains("global @a = alloc [[i32, 3], 2], {{1, 0, 0}, {2, 3, 0}}"));
}

#[test]
fn brace_alignment_consumes_whole_rows() {
    // {1,2,3} 已填满首行，{4} 对齐到第二行
    let ir = compile_ir("int a[2][3] = {1, 2, 3, {4}};\nint main() { return 0; }");
    assert!(ir.contains("{{1, 2, 3}, {4, 0, 0}}"));
}

#[test]
fn uninitialized_global_gets_zeroinit() {
    let ir = compile_ir("int g;\nint z[4];\nint main() { return g; }");
    assert!(ir.contains("global @g = alloc i32, zeroinit"));
    assert!(ir.contains("global @z = alloc [i32, 4], zeroinit"));
}

#[test]
fn decayed_parameter_uses_getptr_then_getelemptr() {
    let ir = compile_ir(
        "int sum(int a[][3], int n) {
            int s = 0;
            int i = 0;
            while (i < n) { s = s + a[i][2]; i = i + 1; }
            return s;
        }
        int main() { return 0; }",
    );
    assert!(ir.contains("fun @sum(%a: *[i32, 3], %n: i32): i32"));
    assert!(ir.contains("getptr"));
    assert!(ir.contains("getelemptr"));
    // 衰退指针先从形参栈槽 load 出来再 getptr
    assert!(ir.contains("%while_entry:"));
    assert!(ir.contains("%while_body:"));
    assert!(ir.contains("%while_end:"));
}

#[test]
fn array_argument_decays_with_getelemptr_zero() {
    let ir = compile_ir(
        "int g[4];
        int main() { return getarray(g); }",
    );
    assert!(ir.contains("getelemptr @g, 0"));
}

#[test]
fn const_array_element_read_is_folded() {
    let ir = compile_ir("const int a[2][2] = {{5, 6}, {7, 8}};\nint main() { return a[1][0]; }");
    assert!(ir.contains("ret 7"));
    assert!(!ir.contains("load"));
}

#[test]
fn const_scalar_folds_into_dimensions_and_values() {
    let ir = compile_ir(
        "const int N = 2 + 2;
        int a[N];
        int main() { return N * 2; }",
    );
    assert!(ir.contains("global @a = alloc [i32, 4], zeroinit"));
    assert!(ir.contains("ret 8"));
}

#[test]
fn implicit_returns_are_added() {
    let ir = compile_ir("void f() { }\nint main() { }");
    assert!(ir.contains("fun @f() {"));
    assert!(ir.contains("  ret\n"));
    assert!(ir.contains("  ret 0"));
}

#[test]
fn if_blocks_appear_in_emission_order() {
    let ir = compile_ir(
        "int main() {
            int a = getint();
            if (a > 0) { return 1; } else { return 2; }
        }",
    );
    let then_pos = ir.find("%then:").expect("then block");
    let else_pos = ir.find("%else:").expect("else block");
    let end_pos = ir.find("%end:").expect("end block");
    assert!(then_pos < else_pos && else_pos < end_pos);
}

#[test]
fn unreachable_code_after_return_is_dropped() {
    let ir = compile_ir("int main() { return 1; return 2; }");
    assert!(ir.contains("ret 1"));
    assert!(!ir.contains("ret 2"));
}

#[test]
fn while_break_continue() {
    let ir = compile_ir(
        "int main() {
            int i = 0;
            while (1) {
                i = i + 1;
                if (i == 10) { break; }
                continue;
            }
            return i;
        }",
    );
    assert!(ir.contains("jump %while_end"));
    assert!(ir.contains("jump %while_entry"));
}

#[test]
fn round_trip_through_reader_is_stable() {
    let sources = [
        "int main() { return 42; }",
        "int g = 3;\nint a[2][3] = {{1}, {2, 3}};\nint main() { return g + a[1][1]; }",
        "int f(int x) { if (x > 0) { return x; } return 0 - x; }\nint main() { return f(0 - 5); }",
        "int main() { int i = 0; int s = 0; while (i < 10) { s = s + i; i = i + 1; } return s; }",
        "int main() { int a = getint(); int b = getint(); return a && b || !a; }",
    ];
    for src in sources {
        let first = compile_ir(src);
        let program = parse_ir(&first).expect("printer output must parse");
        let second = emit_ir(&program);
        assert_eq!(first, second, "round trip changed the text for: {}", src);
    }
}

#[test]
fn error_break_outside_loop() {
    let err = compile_err("int main() { break; return 0; }");
    assert!(err.to_string().contains("break"));
}

#[test]
fn error_continue_outside_loop() {
    let err = compile_err("int main() { continue; return 0; }");
    assert!(err.to_string().contains("continue"));
}

#[test]
fn error_undefined_variable() {
    let err = compile_err("int main() { return nope; }");
    assert!(err.to_string().contains("nope"));
}

#[test]
fn error_undefined_function() {
    let err = compile_err("int main() { return nope(); }");
    assert!(err.to_string().contains("nope"));
}

#[test]
fn error_redefinition_in_same_scope() {
    let err = compile_err("int main() { int x = 1; int x = 2; return x; }");
    assert!(err.to_string().contains("already declared"));
}

#[test]
fn error_duplicate_function() {
    let err = compile_err("int f() { return 0; }\nint f() { return 1; }\nint main() { return 0; }");
    assert!(err.to_string().contains("already declared"));
}

#[test]
fn error_assign_to_constant() {
    let err = compile_err("int main() { const int c = 1; c = 2; return c; }");
    assert!(err.to_string().contains("constant"));
}

#[test]
fn error_assign_to_constant_array_element() {
    let err = compile_err("const int a[2] = {1, 2};\nint main() { a[0] = 3; return 0; }");
    assert!(err.to_string().contains("constant"));
}

#[test]
fn error_nonconst_array_dimension() {
    let err = compile_err("int main() { int n = getint(); int a[n]; return 0; }");
    assert!(err.to_string().contains("constant"));
}

#[test]
fn error_nonconst_global_init() {
    let err = compile_err("int g = getint();\nint main() { return g; }");
    assert!(err.to_string().contains("constant expressions"));
}

#[test]
fn error_too_many_initializers() {
    let err = compile_err("int a[2] = {1, 2, 3};\nint main() { return 0; }");
    assert!(err.to_string().contains("Too many initializers"));
}

#[test]
fn error_call_arity_mismatch() {
    let err = compile_err("int f(int a) { return a; }\nint main() { return f(1, 2); }");
    assert!(err.to_string().contains("argument count"));
}

#[test]
fn const_division_by_zero_folds_to_zero() {
    let ir = compile_ir("const int c = 5 / 0;\nint main() { return c; }");
    assert!(ir.contains("ret 0"));
}
