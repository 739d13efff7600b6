use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// 类型句柄。所有类型经过驻留，结构相同的类型共享同一实例，
/// 因此相等性比较与哈希都按指针进行。
#[derive(Clone, Eq)]
pub struct Type(Rc<TypeKind>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Int32,
    Void,
    Label,
    Pointer(Type),
    Array(Type, usize),
    Function(Vec<Type>, Type),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            TypeKind::Int32 => write!(f, "i32"),
            TypeKind::Void => write!(f, "void"),
            TypeKind::Label => write!(f, "label"),
            TypeKind::Pointer(base) => write!(f, "*{}", base),
            TypeKind::Array(elem, len) => write!(f, "[{}, {}]", elem, len),
            TypeKind::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")?;
                if !ret.is_void() {
                    write!(f, " -> {}", ret)?;
                }
                Ok(())
            }
        }
    }
}

thread_local! {
    // 类型驻留池。组件类型已是规范实例，因此按 TypeKind 查表即可。
    static POOL: RefCell<HashMap<TypeKind, Type>> = RefCell::new(HashMap::new());
}

impl Type {
    pub fn get(kind: TypeKind) -> Type {
        POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if let Some(ty) = pool.get(&kind) {
                return ty.clone();
            }
            let ty = Type(Rc::new(kind.clone()));
            pool.insert(kind, ty.clone());
            ty
        })
    }

    pub fn get_i32() -> Type {
        Type::get(TypeKind::Int32)
    }

    pub fn get_void() -> Type {
        Type::get(TypeKind::Void)
    }

    pub fn get_label() -> Type {
        Type::get(TypeKind::Label)
    }

    pub fn get_pointer(base: Type) -> Type {
        Type::get(TypeKind::Pointer(base))
    }

    pub fn get_array(elem: Type, len: usize) -> Type {
        Type::get(TypeKind::Array(elem, len))
    }

    pub fn get_function(params: Vec<Type>, ret: Type) -> Type {
        Type::get(TypeKind::Function(params, ret))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    pub fn is_i32(&self) -> bool {
        matches!(self.kind(), TypeKind::Int32)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind(), TypeKind::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind(), TypeKind::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind(), TypeKind::Array(..))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind(), TypeKind::Function(..))
    }

    /// 字节大小。目标为 RV32，指针固定 4 字节。
    pub fn size(&self) -> usize {
        match self.kind() {
            TypeKind::Int32 => 4,
            TypeKind::Void | TypeKind::Label | TypeKind::Function(..) => 0,
            TypeKind::Pointer(_) => 4,
            TypeKind::Array(elem, len) => elem.size() * len,
        }
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Pointer(base) => Some(base),
            _ => None,
        }
    }

    pub fn array_elem(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Array(elem, _) => Some(elem),
            _ => None,
        }
    }

    pub fn array_len(&self) -> Option<usize> {
        match self.kind() {
            TypeKind::Array(_, len) => Some(*len),
            _ => None,
        }
    }

    pub fn ret_type(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Function(_, ret) => Some(ret),
            _ => None,
        }
    }

    pub fn param_types(&self) -> Option<&[Type]> {
        match self.kind() {
            TypeKind::Function(params, _) => Some(params),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_gives_identity() {
        let a = Type::get_array(Type::get_i32(), 4);
        let b = Type::get_array(Type::get_i32(), 4);
        assert_eq!(a, b);
        assert!(Rc::ptr_eq(&a.0, &b.0));
        let c = Type::get_array(Type::get_i32(), 5);
        assert_ne!(a, c);
    }

    #[test]
    fn sizes() {
        assert_eq!(Type::get_i32().size(), 4);
        assert_eq!(Type::get_void().size(), 0);
        assert_eq!(Type::get_pointer(Type::get_i32()).size(), 4);
        let arr = Type::get_array(Type::get_array(Type::get_i32(), 3), 2);
        assert_eq!(arr.size(), 24);
    }

    #[test]
    fn display_syntax() {
        let ptr = Type::get_pointer(Type::get_array(Type::get_i32(), 3));
        assert_eq!(ptr.to_string(), "*[i32, 3]");
        let f = Type::get_function(vec![Type::get_i32()], Type::get_void());
        assert_eq!(f.to_string(), "(i32)");
        let g = Type::get_function(vec![], Type::get_i32());
        assert_eq!(g.to_string(), "() -> i32");
    }

    #[test]
    fn accessors() {
        let arr = Type::get_array(Type::get_i32(), 8);
        let ptr = Type::get_pointer(arr.clone());
        assert_eq!(ptr.pointee(), Some(&arr));
        assert_eq!(arr.array_elem(), Some(&Type::get_i32()));
        assert_eq!(arr.array_len(), Some(8));
        assert_eq!(Type::get_i32().pointee(), None);
    }
}
