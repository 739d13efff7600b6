//! IR 文本形式的解析，与 `writer` 互为往返。
//!
//! 解析分两遍：第一遍收集所有函数签名（使前向调用可解析）并
//! 处理全局变量；第二遍解析函数体。文本中名字到句柄的对应
//! 通过每函数一张名字表重新建立。
//!
//! 文本按行组织：一行一条指令或一个基本块头，与 writer 的输出一致。

use std::collections::HashMap;

use crate::ir::entities::*;
use crate::ir::types::Type;
use crate::utils::error::CompilerError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    // 带 @ 或 % 前缀的符号
    Sym(String),
    // 裸单词：指令助记符与关键字
    Word(String),
    Int(i32),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Assign,
    Star,
}

#[derive(Debug, Clone)]
struct SpannedTok {
    tok: Tok,
    line: usize,
}

fn err(line: usize, msg: impl Into<String>) -> CompilerError {
    CompilerError::IRParseError(format!("{} at line {}", msg.into(), line))
}

fn tokenize(input: &str) -> Result<Vec<SpannedTok>, CompilerError> {
    let mut toks = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = idx + 1;
        let content = match raw_line.find("//") {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let mut chars = content.char_indices().peekable();
        while let Some(&(pos, c)) = chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    chars.next();
                }
                '(' | ')' | '{' | '}' | '[' | ']' | ',' | ':' | '=' | '*' => {
                    chars.next();
                    toks.push(SpannedTok {
                        tok: match c {
                            '(' => Tok::LParen,
                            ')' => Tok::RParen,
                            '{' => Tok::LBrace,
                            '}' => Tok::RBrace,
                            '[' => Tok::LBracket,
                            ']' => Tok::RBracket,
                            ',' => Tok::Comma,
                            ':' => Tok::Colon,
                            '=' => Tok::Assign,
                            _ => Tok::Star,
                        },
                        line,
                    });
                }
                '@' | '%' => {
                    chars.next();
                    let mut name = String::new();
                    name.push(c);
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.len() == 1 {
                        return Err(err(line, "empty symbol name"));
                    }
                    toks.push(SpannedTok {
                        tok: Tok::Sym(name),
                        line,
                    });
                }
                '-' | '0'..='9' => {
                    let negative = c == '-';
                    if negative {
                        chars.next();
                    }
                    let mut digits = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_digit() {
                            digits.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if digits.is_empty() {
                        return Err(err(line, "expected digits after '-'"));
                    }
                    let value = digits
                        .parse::<i64>()
                        .map_err(|_| err(line, format!("integer literal out of range: {}", digits)))?;
                    let value = if negative { -value } else { value };
                    toks.push(SpannedTok {
                        tok: Tok::Int(value as i32),
                        line,
                    });
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut word = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            word.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    toks.push(SpannedTok {
                        tok: Tok::Word(word),
                        line,
                    });
                }
                _ => {
                    return Err(err(line, format!("unexpected character '{}' at column {}", c, pos + 1)));
                }
            }
        }
    }
    Ok(toks)
}

// 按行切分 token 序列，保持行号
fn split_lines(toks: &[SpannedTok]) -> Vec<(usize, Vec<Tok>)> {
    let mut lines: Vec<(usize, Vec<Tok>)> = Vec::new();
    for t in toks {
        match lines.last_mut() {
            Some((line, tokens)) if *line == t.line => tokens.push(t.tok.clone()),
            _ => lines.push((t.line, vec![t.tok.clone()])),
        }
    }
    lines
}

// 单行 token 的游标
struct Cursor<'a> {
    toks: &'a [Tok],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(toks: &'a [Tok], line: usize) -> Self {
        Self { toks, pos: 0, line }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Result<&Tok, CompilerError> {
        let tok = self
            .toks
            .get(self.pos)
            .ok_or_else(|| err(self.line, "unexpected end of line"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, tok: Tok) -> Result<(), CompilerError> {
        let line = self.line;
        let found = self.next()?;
        if *found == tok {
            Ok(())
        } else {
            Err(err(line, format!("expected {:?}, found {:?}", tok, found)))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), CompilerError> {
        let line = self.line;
        match self.next()? {
            Tok::Word(w) if w == word => Ok(()),
            found => Err(err(line, format!("expected '{}', found {:?}", word, found))),
        }
    }

    fn sym(&mut self) -> Result<String, CompilerError> {
        let line = self.line;
        match self.next()? {
            Tok::Sym(name) => Ok(name.clone()),
            found => Err(err(line, format!("expected a symbol, found {:?}", found))),
        }
    }

    fn int(&mut self) -> Result<i32, CompilerError> {
        let line = self.line;
        match self.next()? {
            Tok::Int(value) => Ok(*value),
            found => Err(err(line, format!("expected an integer, found {:?}", found))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn finish(&self) -> Result<(), CompilerError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(err(self.line, "trailing tokens on line"))
        }
    }

    // 类型语法：i32 | void | *T | [T, N]
    fn ty(&mut self) -> Result<Type, CompilerError> {
        match self.next()?.clone() {
            Tok::Word(w) if w == "i32" => Ok(Type::get_i32()),
            Tok::Word(w) if w == "void" => Ok(Type::get_void()),
            Tok::Star => Ok(Type::get_pointer(self.ty()?)),
            Tok::LBracket => {
                let elem = self.ty()?;
                self.expect(Tok::Comma)?;
                let len = self.int()?;
                if len < 0 {
                    return Err(err(self.line, "array length must be non-negative"));
                }
                self.expect(Tok::RBracket)?;
                Ok(Type::get_array(elem, len as usize))
            }
            found => Err(err(self.line, format!("expected a type, found {:?}", found))),
        }
    }
}

// 函数头信息（第一遍收集）
struct FuncHeader {
    name: String,
    params: Vec<(Option<String>, Type)>,
    ret_ty: Type,
    // 函数体的行范围（按 split_lines 的下标，不含花括号行本身的剩余部分）
    body: Vec<(usize, Vec<Tok>)>,
}

/// 解析 IR 文本，重建 Program
pub fn parse_ir(input: &str) -> Result<Program, CompilerError> {
    let toks = tokenize(input)?;
    let lines = split_lines(&toks);
    let mut program = Program::new();
    let mut globals: HashMap<String, Value> = HashMap::new();
    let mut headers: Vec<FuncHeader> = Vec::new();

    // 第一遍：全局变量、函数声明与函数头
    let mut i = 0;
    while i < lines.len() {
        let (line_no, line) = &lines[i];
        let mut cur = Cursor::new(line, *line_no);
        match cur.next()?.clone() {
            Tok::Word(w) if w == "global" => {
                parse_global(&mut cur, &mut program, &mut globals)?;
                cur.finish()?;
                i += 1;
            }
            Tok::Word(w) if w == "decl" => {
                let (name, param_tys, ret_ty) = parse_decl(&mut cur)?;
                cur.finish()?;
                program.new_func(FunctionData::new(name, param_tys, ret_ty));
                i += 1;
            }
            Tok::Word(w) if w == "fun" => {
                let (name, params, ret_ty) = parse_fun_header(&mut cur)?;
                cur.finish()?;
                // 收集函数体各行，直到单独的 '}' 行
                let mut body = Vec::new();
                i += 1;
                loop {
                    let (line_no, line) = lines
                        .get(i)
                        .ok_or_else(|| err(*line_no, "unterminated function body"))?;
                    if line.len() == 1 && line[0] == Tok::RBrace {
                        i += 1;
                        break;
                    }
                    body.push((*line_no, line.clone()));
                    i += 1;
                }
                headers.push(FuncHeader {
                    name,
                    params,
                    ret_ty,
                    body,
                });
            }
            found => {
                return Err(err(*line_no, format!("unexpected token {:?}", found)));
            }
        }
    }

    // 创建全部函数，建立名字表
    let mut func_table: HashMap<String, Function> = HashMap::new();
    for &func in program.func_layout() {
        let name = program.func(func).name().to_string();
        if func_table.insert(name.clone(), func).is_some() {
            return Err(CompilerError::IRParseError(format!(
                "function `{}` declared twice",
                name
            )));
        }
    }
    let mut defined: Vec<Function> = Vec::new();
    for header in &headers {
        if func_table.contains_key(&header.name) {
            return Err(CompilerError::IRParseError(format!(
                "function `{}` defined twice",
                header.name
            )));
        }
        let func = program.new_func(FunctionData::with_param_names(
            header.name.clone(),
            header.params.clone(),
            header.ret_ty.clone(),
        ));
        func_table.insert(header.name.clone(), func);
        defined.push(func);
    }

    // 第二遍：解析函数体
    for (header, &func) in headers.iter().zip(&defined) {
        parse_body(&mut program, func, &func_table, &globals, header)?;
    }
    Ok(program)
}

fn parse_global(
    cur: &mut Cursor,
    program: &mut Program,
    globals: &mut HashMap<String, Value>,
) -> Result<(), CompilerError> {
    let name = cur.sym()?;
    cur.expect(Tok::Assign)?;
    cur.expect_word("alloc")?;
    let ty = cur.ty()?;
    cur.expect(Tok::Comma)?;
    let init = parse_init(cur, program, &ty)?;
    let global = program.new_value().global_alloc(init);
    program.set_value_name(global, Some(name.clone()));
    if globals.insert(name.clone(), global).is_some() {
        return Err(err(cur.line, format!("global `{}` defined twice", name)));
    }
    Ok(())
}

fn parse_init(cur: &mut Cursor, program: &mut Program, ty: &Type) -> Result<Value, CompilerError> {
    match cur.peek() {
        Some(Tok::Int(_)) => {
            let value = cur.int()?;
            if !ty.is_i32() {
                return Err(err(cur.line, "integer initializer for a non-i32 type"));
            }
            Ok(program.new_value().integer(value))
        }
        Some(Tok::Word(w)) if w == "zeroinit" => {
            cur.next()?;
            Ok(program.new_value().zero_init(ty.clone()))
        }
        Some(Tok::LBrace) => {
            cur.next()?;
            let elem_ty = ty
                .array_elem()
                .ok_or_else(|| err(cur.line, "aggregate initializer for a non-array type"))?
                .clone();
            let len = ty.array_len().unwrap_or(0);
            let mut elems = Vec::new();
            loop {
                elems.push(parse_init(cur, program, &elem_ty)?);
                let line = cur.line;
                match cur.next()? {
                    Tok::Comma => continue,
                    Tok::RBrace => break,
                    found => {
                        return Err(err(line, format!("expected ',' or '}}', found {:?}", found)))
                    }
                }
            }
            if elems.len() != len {
                return Err(err(
                    cur.line,
                    format!("aggregate has {} elements, type expects {}", elems.len(), len),
                ));
            }
            Ok(program.new_value().aggregate(elems))
        }
        _ => Err(err(cur.line, "expected an initializer")),
    }
}

fn parse_decl(cur: &mut Cursor) -> Result<(String, Vec<Type>, Type), CompilerError> {
    let name = cur.sym()?;
    if !name.starts_with('@') {
        return Err(err(cur.line, "function name must carry the @ prefix"));
    }
    cur.expect(Tok::LParen)?;
    let mut param_tys = Vec::new();
    if cur.peek() != Some(&Tok::RParen) {
        loop {
            param_tys.push(cur.ty()?);
            let line = cur.line;
            match cur.next()? {
                Tok::Comma => continue,
                Tok::RParen => break,
                found => return Err(err(line, format!("expected ',' or ')', found {:?}", found))),
            }
        }
    } else {
        cur.next()?;
    }
    let ret_ty = if cur.peek() == Some(&Tok::Colon) {
        cur.next()?;
        cur.ty()?
    } else {
        Type::get_void()
    };
    Ok((name, param_tys, ret_ty))
}

type FunHeaderParts = (String, Vec<(Option<String>, Type)>, Type);

fn parse_fun_header(cur: &mut Cursor) -> Result<FunHeaderParts, CompilerError> {
    let name = cur.sym()?;
    if !name.starts_with('@') {
        return Err(err(cur.line, "function name must carry the @ prefix"));
    }
    cur.expect(Tok::LParen)?;
    let mut params = Vec::new();
    if cur.peek() != Some(&Tok::RParen) {
        loop {
            let pname = cur.sym()?;
            cur.expect(Tok::Colon)?;
            let ty = cur.ty()?;
            params.push((Some(pname), ty));
            let line = cur.line;
            match cur.next()? {
                Tok::Comma => continue,
                Tok::RParen => break,
                found => return Err(err(line, format!("expected ',' or ')', found {:?}", found))),
            }
        }
    } else {
        cur.next()?;
    }
    let ret_ty = if cur.peek() == Some(&Tok::Colon) {
        cur.next()?;
        cur.ty()?
    } else {
        Type::get_void()
    };
    cur.expect(Tok::LBrace)?;
    Ok((name, params, ret_ty))
}

// 基本块头：%bb: 或 %bb(%a: i32, ...):
fn is_block_header(line: &[Tok]) -> bool {
    matches!(
        (line.first(), line.get(1)),
        (Some(Tok::Sym(_)), Some(Tok::Colon)) | (Some(Tok::Sym(_)), Some(Tok::LParen))
    )
}

fn parse_body(
    program: &mut Program,
    func: Function,
    func_table: &HashMap<String, Function>,
    globals: &HashMap<String, Value>,
    header: &FuncHeader,
) -> Result<(), CompilerError> {
    let mut values: HashMap<String, Value> = HashMap::new();
    for (&param, (pname, _)) in program.func(func).params().iter().zip(&header.params) {
        if let Some(pname) = pname {
            values.insert(pname.clone(), param);
        }
    }

    // 先建出所有基本块（带参数），跳转目标因此可以前向引用
    let mut bbs: HashMap<String, BasicBlock> = HashMap::new();
    for (line_no, line) in &header.body {
        if !is_block_header(line) {
            continue;
        }
        let mut cur = Cursor::new(line, *line_no);
        let name = cur.sym()?;
        let mut param_list: Vec<(String, Type)> = Vec::new();
        if cur.peek() == Some(&Tok::LParen) {
            cur.next()?;
            loop {
                let pname = cur.sym()?;
                cur.expect(Tok::Colon)?;
                let ty = cur.ty()?;
                param_list.push((pname, ty));
                let line = cur.line;
                match cur.next()? {
                    Tok::Comma => continue,
                    Tok::RParen => break,
                    found => {
                        return Err(err(line, format!("expected ',' or ')', found {:?}", found)))
                    }
                }
            }
        }
        cur.expect(Tok::Colon)?;
        cur.finish()?;
        if bbs.contains_key(&name) {
            return Err(err(*line_no, format!("basic block `{}` defined twice", name)));
        }
        let func_data = program.func_mut(func);
        let param_tys = param_list.iter().map(|(_, ty)| ty.clone()).collect();
        let bb = func_data
            .dfg_mut()
            .new_bb()
            .basic_block_with_params(Some(name.clone()), param_tys);
        func_data.layout_mut().push_bb(bb);
        let params = func_data.dfg().bb(bb).params().to_vec();
        for (&param, (pname, _)) in params.iter().zip(&param_list) {
            func_data.dfg_mut().set_value_name(param, Some(pname.clone()));
            values.insert(pname.clone(), param);
        }
        bbs.insert(name, bb);
    }

    // 第二遍：逐行解析指令
    let mut current_bb: Option<BasicBlock> = None;
    for (line_no, line) in &header.body {
        if is_block_header(line) {
            let mut cur = Cursor::new(line, *line_no);
            let name = cur.sym()?;
            current_bb = Some(bbs[&name]);
            continue;
        }
        let bb = current_bb.ok_or_else(|| err(*line_no, "instruction outside of a basic block"))?;
        let mut cur = Cursor::new(line, *line_no);
        parse_inst(
            program, func, bb, &mut cur, func_table, globals, &bbs, &mut values,
        )?;
        cur.finish()?;
    }
    Ok(())
}

// 指令解析环境：名字表与目标函数
struct OperandEnv<'a> {
    globals: &'a HashMap<String, Value>,
    values: &'a HashMap<String, Value>,
    bbs: &'a HashMap<String, BasicBlock>,
    func_table: &'a HashMap<String, Function>,
    func: Function,
}

impl<'a> OperandEnv<'a> {
    // 操作数：整型字面量或名字引用
    fn operand(&self, program: &mut Program, cur: &mut Cursor) -> Result<Value, CompilerError> {
        match cur.next()?.clone() {
            Tok::Int(value) => Ok(program
                .func_mut(self.func)
                .dfg_mut()
                .new_value()
                .integer(value)),
            Tok::Sym(name) => self
                .values
                .get(&name)
                .or_else(|| self.globals.get(&name))
                .copied()
                .ok_or_else(|| err(cur.line, format!("undefined value `{}`", name))),
            found => Err(err(cur.line, format!("expected an operand, found {:?}", found))),
        }
    }

    // 跳转目标：%bb 或 %bb(args)
    fn target(
        &self,
        program: &mut Program,
        cur: &mut Cursor,
    ) -> Result<(BasicBlock, Vec<Value>), CompilerError> {
        let name = cur.sym()?;
        let target = *self
            .bbs
            .get(&name)
            .ok_or_else(|| err(cur.line, format!("undefined basic block `{}`", name)))?;
        let mut args = Vec::new();
        if cur.peek() == Some(&Tok::LParen) {
            cur.next()?;
            loop {
                args.push(self.operand(program, cur)?);
                let line = cur.line;
                match cur.next()? {
                    Tok::Comma => continue,
                    Tok::RParen => break,
                    found => {
                        return Err(err(line, format!("expected ',' or ')', found {:?}", found)))
                    }
                }
            }
        }
        Ok((target, args))
    }

    fn call(&self, program: &mut Program, cur: &mut Cursor) -> Result<Value, CompilerError> {
        let callee_name = cur.sym()?;
        let callee = *self
            .func_table
            .get(&callee_name)
            .ok_or_else(|| err(cur.line, format!("undefined function `{}`", callee_name)))?;
        cur.expect(Tok::LParen)?;
        let mut args = Vec::new();
        if cur.peek() != Some(&Tok::RParen) {
            loop {
                args.push(self.operand(program, cur)?);
                let line = cur.line;
                match cur.next()? {
                    Tok::Comma => continue,
                    Tok::RParen => break,
                    found => {
                        return Err(err(line, format!("expected ',' or ')', found {:?}", found)))
                    }
                }
            }
        } else {
            cur.next()?;
        }
        let ret_ty = program.func(callee).ret_ty().clone();
        Ok(program
            .func_mut(self.func)
            .dfg_mut()
            .new_value()
            .call(callee, args, ret_ty))
    }
}

#[allow(clippy::too_many_arguments)]
fn parse_inst(
    program: &mut Program,
    func: Function,
    bb: BasicBlock,
    cur: &mut Cursor,
    func_table: &HashMap<String, Function>,
    globals: &HashMap<String, Value>,
    bbs: &HashMap<String, BasicBlock>,
    values: &mut HashMap<String, Value>,
) -> Result<(), CompilerError> {
    let env = OperandEnv {
        globals,
        values,
        bbs,
        func_table,
        func,
    };

    match cur.next()?.clone() {
        // 带结果名的指令
        Tok::Sym(result) => {
            cur.expect(Tok::Assign)?;
            let inst = match cur.next()?.clone() {
                Tok::Word(w) if w == "alloc" => {
                    let ty = cur.ty()?;
                    program.func_mut(func).dfg_mut().new_value().alloc(ty)
                }
                Tok::Word(w) if w == "load" => {
                    let src = env.operand(program, cur)?;
                    program.func_mut(func).dfg_mut().new_value().load(src)
                }
                Tok::Word(w) if w == "getelemptr" => {
                    let src = env.operand(program, cur)?;
                    cur.expect(Tok::Comma)?;
                    let index = env.operand(program, cur)?;
                    program
                        .func_mut(func)
                        .dfg_mut()
                        .new_value()
                        .get_elem_ptr(src, index)
                }
                Tok::Word(w) if w == "getptr" => {
                    let src = env.operand(program, cur)?;
                    cur.expect(Tok::Comma)?;
                    let index = env.operand(program, cur)?;
                    program.func_mut(func).dfg_mut().new_value().get_ptr(src, index)
                }
                Tok::Word(w) if w == "call" => env.call(program, cur)?,
                Tok::Word(w) => {
                    let op = BinaryOp::from_mnemonic(&w)
                        .ok_or_else(|| err(cur.line, format!("unknown opcode `{}`", w)))?;
                    let lhs = env.operand(program, cur)?;
                    cur.expect(Tok::Comma)?;
                    let rhs = env.operand(program, cur)?;
                    program.func_mut(func).dfg_mut().new_value().binary(op, lhs, rhs)
                }
                found => return Err(err(cur.line, format!("expected an opcode, found {:?}", found))),
            };
            let func_data = program.func_mut(func);
            func_data.dfg_mut().set_value_name(inst, Some(result.clone()));
            func_data.layout_mut().push_inst(bb, inst);
            values.insert(result, inst);
        }
        Tok::Word(w) if w == "store" => {
            let value = env.operand(program, cur)?;
            cur.expect(Tok::Comma)?;
            let dest = env.operand(program, cur)?;
            let inst = program.func_mut(func).dfg_mut().new_value().store(value, dest);
            program.func_mut(func).layout_mut().push_inst(bb, inst);
        }
        Tok::Word(w) if w == "br" => {
            let cond = env.operand(program, cur)?;
            cur.expect(Tok::Comma)?;
            let (true_bb, true_args) = env.target(program, cur)?;
            cur.expect(Tok::Comma)?;
            let (false_bb, false_args) = env.target(program, cur)?;
            let inst = program
                .func_mut(func)
                .dfg_mut()
                .new_value()
                .branch_with_args(cond, true_bb, false_bb, true_args, false_args);
            program.func_mut(func).layout_mut().push_inst(bb, inst);
        }
        Tok::Word(w) if w == "jump" => {
            let (target, args) = env.target(program, cur)?;
            let inst = program
                .func_mut(func)
                .dfg_mut()
                .new_value()
                .jump_with_args(target, args);
            program.func_mut(func).layout_mut().push_inst(bb, inst);
        }
        Tok::Word(w) if w == "ret" => {
            let value = if cur.at_end() {
                None
            } else {
                Some(env.operand(program, cur)?)
            };
            let inst = program.func_mut(func).dfg_mut().new_value().ret(value);
            program.func_mut(func).layout_mut().push_inst(bb, inst);
        }
        Tok::Word(w) if w == "call" => {
            let inst = env.call(program, cur)?;
            program.func_mut(func).layout_mut().push_inst(bb, inst);
        }
        found => return Err(err(cur.line, format!("unexpected token {:?}", found))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::writer::emit_ir;

    const SAMPLE: &str = r#"global @g = alloc i32, 0
global @arr = alloc [i32, 4], {1, 2, 0, 0}
decl @getint(): i32
decl @putint(i32)

fun @main(): i32 {
%entry:
  %0 = alloc i32
  store 1, %0
  %1 = load %0
  %2 = call @getint()
  %3 = add %1, %2
  ret %3
}
"#;

    #[test]
    fn parses_printer_output() {
        let program = parse_ir(SAMPLE).expect("sample must parse");
        assert_eq!(program.inst_layout().len(), 2);
        assert_eq!(program.func_layout().len(), 3);
        let main = program
            .func_layout()
            .iter()
            .map(|&f| program.func(f))
            .find(|f| f.name() == "@main")
            .expect("main exists");
        assert!(!main.is_decl());
        assert_eq!(main.layout().bbs().len(), 1);
        let entry = main.layout().entry_bb().unwrap();
        assert_eq!(main.layout().insts(entry).len(), 6);
    }

    #[test]
    fn round_trip_is_stable() {
        let program = parse_ir(SAMPLE).expect("sample must parse");
        let first = emit_ir(&program);
        let reparsed = parse_ir(&first).expect("printer output must parse");
        let second = emit_ir(&reparsed);
        assert_eq!(first, second);
    }

    #[test]
    fn parses_block_params_and_branches() {
        let text = r#"fun @pick(%c: i32): i32 {
%entry:
  br %c, %then, %end(0)

%then:
  jump %end(1)

%end(%v: i32):
  ret %v
}
"#;
        let program = parse_ir(text).expect("must parse");
        let func = program.func(program.func_layout()[0]);
        assert_eq!(func.layout().bbs().len(), 3);
        let end = func.layout().bbs()[2];
        assert_eq!(func.dfg().bb(end).params().len(), 1);
        let entry = func.layout().entry_bb().unwrap();
        let br = func.layout().last_inst(entry).unwrap();
        match func.dfg().value(br).kind() {
            ValueKind::Branch(b) => {
                assert_eq!(b.true_args().len(), 0);
                assert_eq!(b.false_args().len(), 1);
            }
            other => panic!("expected a branch, got {:?}", other),
        }
        // 往返后块参数与跳转实参保持一致
        let text2 = emit_ir(&program);
        assert!(text2.contains("%end(%v: i32):"));
        assert!(text2.contains("jump %end(1)"));
    }

    #[test]
    fn parses_forward_function_reference() {
        let text = r#"fun @a(): i32 {
%entry:
  %0 = call @b()
  ret %0
}

fun @b(): i32 {
%entry:
  ret 7
}
"#;
        let program = parse_ir(text).expect("must parse");
        assert_eq!(program.func_layout().len(), 2);
    }

    #[test]
    fn rejects_undefined_value() {
        let text = "fun @f(): i32 {\n%entry:\n  ret %nope\n}\n";
        assert!(parse_ir(text).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(parse_ir("fun main() {\n}\n").is_err());
        assert!(parse_ir("what is this").is_err());
    }

    #[test]
    fn zeroinit_global_round_trips() {
        let text = "global @z = alloc [i32, 8], zeroinit\n";
        let program = parse_ir(text).expect("must parse");
        let out = emit_ir(&program);
        assert!(out.contains("global @z = alloc [i32, 8], zeroinit"));
    }
}
