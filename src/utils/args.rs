use crate::CompilerError;
use std::env::args;

/// 命令行参数：`<mode> <input> -o <output>`
///
/// mode 为 -koopa（输出 IR 文本）、-riscv 或 -perf（输出 RV32 汇编）。
#[derive(Debug, Clone)]
pub struct Params {
    pub input: String,
    pub output: String,
    pub koopa: bool,
    pub riscv: bool,
    pub perf: bool,
}

impl Params {
    pub fn from_args() -> Result<Self, CompilerError> {
        let mut args = args();
        args.next();
        Self::parse(args)
    }

    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CompilerError> {
        let mut input = String::new();
        let mut output = String::new();
        let mut koopa = false;
        let mut riscv = false;
        let mut perf = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-koopa" => koopa = true,
                "-riscv" => riscv = true,
                "-perf" => perf = true,
                "-o" => match args.next() {
                    Some(o) => output = o,
                    None => {
                        return Err(CompilerError::ArgsError(
                            "Output file not specified after -o".to_string(),
                        ))
                    }
                },
                _ => {
                    if input.is_empty() {
                        input = arg;
                    } else {
                        return Err(CompilerError::ArgsError(
                            "Multiple input files are not supported".to_string(),
                        ));
                    }
                }
            }
        }
        if input.is_empty() {
            return Err(CompilerError::ArgsError(
                "Input file not specified".to_string(),
            ));
        }
        if output.is_empty() {
            return Err(CompilerError::ArgsError(
                "Output file not specified".to_string(),
            ));
        }
        match (koopa as u8) + (riscv as u8) + (perf as u8) {
            0 => Err(CompilerError::ArgsError(
                "No output format specified (-koopa, -riscv, or -perf)".to_string(),
            )),
            1 => Ok(Params {
                input,
                output,
                koopa,
                riscv,
                perf,
            }),
            _ => Err(CompilerError::ArgsError(
                "Multiple output formats specified; please choose only one".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Params, CompilerError> {
        Params::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn accepts_standard_invocation() {
        let p = parse(&["-koopa", "in.c", "-o", "out.koopa"]).unwrap();
        assert!(p.koopa && !p.riscv && !p.perf);
        assert_eq!(p.input, "in.c");
        assert_eq!(p.output, "out.koopa");
    }

    #[test]
    fn rejects_missing_mode_or_paths() {
        assert!(parse(&["in.c", "-o", "out.s"]).is_err());
        assert!(parse(&["-riscv", "-o", "out.s"]).is_err());
        assert!(parse(&["-riscv", "in.c"]).is_err());
        assert!(parse(&["-riscv", "in.c", "-o"]).is_err());
    }

    #[test]
    fn rejects_conflicting_modes() {
        assert!(parse(&["-koopa", "-riscv", "in.c", "-o", "out"]).is_err());
    }
}
