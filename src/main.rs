use lalrpop_util::lexer::Token;
use lalrpop_util::ParseError;
use std::fs::read_to_string;

use sysyc::back::generate_asm;
use sysyc::front::generate_ir;
use sysyc::ir::writer::emit_ir;
use sysyc::sysy;
use sysyc::utils::args::Params;
use sysyc::utils::logger::print_error_and_exit;
use sysyc::utils::SourceMap;
use sysyc::CompilerError;

fn main() {
    if let Err(e) = run() {
        print_error_and_exit(&e, 1);
    }
}

fn format_expected(expected: Vec<String>) -> String {
    if expected.is_empty() {
        "no expected tokens".to_string()
    } else {
        expected.join(", ")
    }
}

fn format_parse_error(source_map: &SourceMap, err: ParseError<usize, Token<'_>, &str>) -> String {
    match err {
        ParseError::InvalidToken { location } => {
            format!("Invalid token at {}", source_map.format_location(location))
        }
        ParseError::UnrecognizedEOF { location, expected } => {
            let expected = format_expected(expected);
            format!(
                "Unexpected end of file at {}. Expected: {}",
                source_map.format_location(location),
                expected
            )
        }
        ParseError::UnrecognizedToken { token, expected } => {
            let (start, tok, _end) = token;
            let expected = format_expected(expected);
            format!(
                "Unrecognized token {:?} at {}. Expected: {}",
                tok,
                source_map.format_location(start),
                expected
            )
        }
        ParseError::ExtraToken { token } => {
            let (start, tok, _end) = token;
            format!(
                "Extra token {:?} at {}",
                tok,
                source_map.format_location(start)
            )
        }
        ParseError::User { error } => {
            format!("Parse error: {}", error)
        }
    }
}

fn run() -> Result<(), CompilerError> {
    // 解析命令行参数
    let params = Params::from_args()?;

    // 读取输入文件
    let input = read_to_string(&params.input)?;
    let source_map = SourceMap::new(&input);

    // 调用 lalrpop 生成的 parser 解析输入文件
    let ast = sysy::CompUnitParser::new()
        .parse(&input)
        .map_err(|e| CompilerError::ParseError(format_parse_error(&source_map, e)))?;

    let program = generate_ir(&ast, Some(source_map))?;

    if params.koopa {
        std::fs::write(&params.output, emit_ir(&program))?;
        return Ok(());
    }
    // -riscv 与 -perf 都输出 RV32 汇编
    let asm = generate_asm(&program)?;
    std::fs::write(&params.output, asm)?;
    Ok(())
}
