use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    X0,             // 恒为 0
    Sp,             // 栈指针 (x2)
    A0, A1, A2, A3, // 参数与返回值
    A4, A5, A6, A7,
    T0, T1, T2,     // 操作数与中间结果
    T6,             // 地址计算专用，不保存操作数
    Ra,             // 返回地址
}

impl Reg {
    /// 实参寄存器 a0-a7
    pub const ARGS: [Reg; 8] = [
        Reg::A0, Reg::A1, Reg::A2, Reg::A3,
        Reg::A4, Reg::A5, Reg::A6, Reg::A7,
    ];
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let r = match self {
            Reg::X0 => "x0",
            Reg::Sp => "sp",
            Reg::A0 => "a0", Reg::A1 => "a1", Reg::A2 => "a2", Reg::A3 => "a3",
            Reg::A4 => "a4", Reg::A5 => "a5", Reg::A6 => "a6", Reg::A7 => "a7",
            Reg::T0 => "t0", Reg::T1 => "t1", Reg::T2 => "t2",
            Reg::T6 => "t6",
            Reg::Ra => "ra",
        };
        write!(f, "{}", r)
    }
}

pub enum Instruction {
    // --- 加载与移动 ---
    Li(Reg, i32),        // li rd, imm (加载立即数)
    La(Reg, String),     // la rd, label (加载地址, 用于全局变量)
    Mv(Reg, Reg),        // mv rd, rs (寄存器间移动)

    // --- 访存类 ---
    Lw(Reg, i32, Reg),   // lw rd, imm12(rs1)
    Sw(Reg, i32, Reg),   // sw rs2, imm12(rs1)

    // --- 运算类 (寄存器-寄存器) ---
    Add(Reg, Reg, Reg),  Sub(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),  Div(Reg, Reg, Reg), Rem(Reg, Reg, Reg),
    And(Reg, Reg, Reg),  Or(Reg, Reg, Reg),
    Slt(Reg, Reg, Reg),  Sgt(Reg, Reg, Reg),

    // --- 运算类 (寄存器-立即数) ---
    Addi(Reg, Reg, i32), // addi rd, rs1, imm12
    Xori(Reg, Reg, i32), // xori rd, rs1, imm12

    // --- 比较类 (伪指令) ---
    Seqz(Reg, Reg),      // seqz rd, rs (rs == 0 ?)
    Snez(Reg, Reg),      // snez rd, rs (rs != 0 ?)

    // --- 控制转移类 ---
    Beqz(Reg, String),   // beqz rs, label (为 0 跳转)
    J(String),           // j label (无条件跳转)
    Call(String),        // call label (函数调用)
    Ret,                 // ret (函数返回)

    // --- 汇编指示符 ---
    Label(String),
    Global(String),
    Section(String),
    Word(i32),           // .word <value>
    Zero(i32),           // .zero <size>
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // --- 加载与移动 ---
            Instruction::Li(rd, imm) => write!(f, "  li {}, {}", rd, imm),
            Instruction::La(rd, label) => write!(f, "  la {}, {}", rd, label),
            Instruction::Mv(rd, rs) => write!(f, "  mv {}, {}", rd, rs),

            // --- 访存类 (注意 offset(reg) 格式) ---
            Instruction::Lw(rd, imm, rs1) => write!(f, "  lw {}, {}({})", rd, imm, rs1),
            Instruction::Sw(rs2, imm, rs1) => write!(f, "  sw {}, {}({})", rs2, imm, rs1),

            // --- 运算类 (寄存器-寄存器) ---
            Instruction::Add(rd, r1, r2) => write!(f, "  add {}, {}, {}", rd, r1, r2),
            Instruction::Sub(rd, r1, r2) => write!(f, "  sub {}, {}, {}", rd, r1, r2),
            Instruction::Mul(rd, r1, r2) => write!(f, "  mul {}, {}, {}", rd, r1, r2),
            Instruction::Div(rd, r1, r2) => write!(f, "  div {}, {}, {}", rd, r1, r2),
            Instruction::Rem(rd, r1, r2) => write!(f, "  rem {}, {}, {}", rd, r1, r2),
            Instruction::And(rd, r1, r2) => write!(f, "  and {}, {}, {}", rd, r1, r2),
            Instruction::Or(rd, r1, r2) => write!(f, "  or {}, {}, {}", rd, r1, r2),
            Instruction::Slt(rd, r1, r2) => write!(f, "  slt {}, {}, {}", rd, r1, r2),
            Instruction::Sgt(rd, r1, r2) => write!(f, "  sgt {}, {}, {}", rd, r1, r2),

            // --- 运算类 (寄存器-立即数) ---
            Instruction::Addi(rd, rs, imm) => write!(f, "  addi {}, {}, {}", rd, rs, imm),
            Instruction::Xori(rd, rs, imm) => write!(f, "  xori {}, {}, {}", rd, rs, imm),

            // --- 比较类 (伪指令) ---
            Instruction::Seqz(rd, rs) => write!(f, "  seqz {}, {}", rd, rs),
            Instruction::Snez(rd, rs) => write!(f, "  snez {}, {}", rd, rs),

            // --- 控制转移类 ---
            Instruction::Beqz(rs, label) => write!(f, "  beqz {}, {}", rs, label),
            Instruction::J(label) => write!(f, "  j {}", label),
            Instruction::Call(label) => write!(f, "  call {}", label),
            Instruction::Ret => write!(f, "  ret"),

            // --- 汇编指示符 (注意 Label 不缩进) ---
            Instruction::Label(name) => write!(f, "{}:", name),
            Instruction::Global(name) => write!(f, "  .globl {}", name),
            Instruction::Section(name) => write!(f, "  {}", name),
            Instruction::Word(value) => write!(f, "  .word {}", value),
            Instruction::Zero(size) => write!(f, "  .zero {}", size),
        }
    }
}
