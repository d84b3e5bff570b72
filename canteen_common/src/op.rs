/// Implements arithmetic operators for a single-field newtype by delegating to the wrapped value.
///
/// ```ignore
/// newtype_ops!(Money => Add::add, Sub::sub);
/// newtype_ops!(Money assign AddAssign::add_assign);
/// newtype_ops!(Money unary Neg::neg);
/// ```
#[macro_export]
macro_rules! newtype_ops {
    ($ty:ident => $($op:ident::$method:ident),+ $(,)?) => {$(
        impl std::ops::$op for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                Self(std::ops::$op::$method(self.0, rhs.0))
            }
        }
    )+};
    ($ty:ident assign $($op:ident::$method:ident),+ $(,)?) => {$(
        impl std::ops::$op for $ty {
            fn $method(&mut self, rhs: Self) {
                std::ops::$op::$method(&mut self.0, rhs.0)
            }
        }
    )+};
    ($ty:ident unary $($op:ident::$method:ident),+ $(,)?) => {$(
        impl std::ops::$op for $ty {
            type Output = Self;

            fn $method(self) -> Self {
                Self(std::ops::$op::$method(self.0))
            }
        }
    )+};
}
